//! Gateway - WebSocket listener that accepts incoming connections.
//!
//! Binds the listen socket, validates the handshake Origin against the
//! configured allow list, and spawns one Connection task per client.

use crate::config::ListenConfig;
use crate::handlers::Registry;
use crate::protocol::ConnectionId;
use crate::state::Coordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tracing::{error, info, instrument, warn};

use super::Connection;

/// The Gateway accepts incoming WebSocket connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    listen_config: ListenConfig,
    coordinator: Arc<Coordinator>,
    registry: Arc<Registry>,
    local_addr: SocketAddr,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        listen_config: ListenConfig,
        coordinator: Arc<Coordinator>,
        registry: Arc<Registry>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen_config.address).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "WebSocket listener bound");
        Ok(Self {
            listener,
            listen_config,
            coordinator,
            registry,
            local_addr,
        })
    }

    /// The bound address (useful when binding port 0 in tests).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "Connection attempt");

                    let coordinator = Arc::clone(&self.coordinator);
                    let registry = Arc::clone(&self.registry);
                    let allowed = self.listen_config.clone();
                    let connection_id = ConnectionId(uuid::Uuid::new_v4().to_string());

                    tokio::spawn(async move {
                        // Origin validation callback for the WebSocket handshake.
                        let origin_callback =
                            |req: &http::Request<()>, response: http::Response<()>| {
                                let origin = req
                                    .headers()
                                    .get("Origin")
                                    .and_then(|o| o.to_str().ok());
                                if allowed.origin_allowed(origin) {
                                    return Ok(response);
                                }
                                warn!(%addr, origin = ?origin, "WebSocket origin rejected");
                                Err(http::Response::builder()
                                    .status(http::StatusCode::FORBIDDEN)
                                    .body(Some("origin not allowed".to_string()))
                                    .unwrap())
                            };

                        match accept_hdr_async(stream, origin_callback).await {
                            Ok(ws_stream) => {
                                let connection = Connection::new(
                                    connection_id.clone(),
                                    ws_stream,
                                    addr,
                                    coordinator,
                                    registry,
                                );
                                if let Err(e) = connection.run().await {
                                    error!(%connection_id, %addr, error = %e, "Connection error");
                                }
                                info!(%connection_id, %addr, "Connection closed");
                            }
                            Err(e) => {
                                warn!(%addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
