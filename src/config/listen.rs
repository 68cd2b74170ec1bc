//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind the WebSocket listener on.
    pub address: SocketAddr,
    /// Allowed Origin headers for the WebSocket handshake.
    /// Empty means all origins are accepted; "*" matches any.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

impl ListenConfig {
    /// Check an Origin header against the allow list.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allow_origins.is_empty() {
            return true;
        }
        match origin {
            Some(origin) => self
                .allow_origins
                .iter()
                .any(|a| a == origin || a == "*"),
            None => false,
        }
    }
}
