//! Room configuration: the static channel set and history capacities.

use serde::Deserialize;

/// A pre-declared named channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelBlock {
    /// Channel id (also the room id on the wire).
    pub id: String,
}

/// Rooms configuration.
///
/// History is a bounded cache, not the system of record; each cap is the
/// ring size after which the oldest message is evicted on insert.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomsConfig {
    /// Pre-declared channels. Users cannot create channels at runtime.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelBlock>,
    /// Public room history cap (default: 100).
    #[serde(default = "default_public_history_cap")]
    pub public_history_cap: usize,
    /// Per-channel history cap (default: 200).
    #[serde(default = "default_channel_history_cap")]
    pub channel_history_cap: usize,
    /// Private pair room history cap (default: 100).
    #[serde(default = "default_private_history_cap")]
    pub private_history_cap: usize,
    /// Messages returned in an initial room history sync (default: 50).
    #[serde(default = "default_history_sync_limit")]
    pub history_sync_limit: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            public_history_cap: default_public_history_cap(),
            channel_history_cap: default_channel_history_cap(),
            private_history_cap: default_private_history_cap(),
            history_sync_limit: default_history_sync_limit(),
        }
    }
}

fn default_channels() -> Vec<ChannelBlock> {
    vec![
        ChannelBlock {
            id: "general".to_string(),
        },
        ChannelBlock {
            id: "random".to_string(),
        },
    ]
}

fn default_public_history_cap() -> usize {
    100
}

fn default_channel_history_cap() -> usize {
    200
}

fn default_private_history_cap() -> usize {
    100
}

fn default_history_sync_limit() -> usize {
    50
}
