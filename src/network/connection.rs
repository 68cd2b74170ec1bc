//! Connection - handles an individual client session.
//!
//! Each connection runs in its own tokio task: a unified `tokio::select!`
//! loop over inbound WebSocket frames and the outgoing event queue. Events
//! from one connection are processed strictly in arrival order; fan-out to
//! this connection from elsewhere lands in the bounded outgoing queue and
//! is written between inbound events.

use crate::handlers::{Context, Registry, Session};
use crate::metrics;
use crate::protocol::{ClientEvent, ConnectionId, ServerEvent};
use crate::state::Coordinator;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, instrument, warn};

use super::limit::RateLimiter;

/// A client connection handler.
pub struct Connection {
    connection_id: ConnectionId,
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    registry: Arc<Registry>,
    stream: WebSocketStream<TcpStream>,
}

impl Connection {
    pub fn new(
        connection_id: ConnectionId,
        stream: WebSocketStream<TcpStream>,
        addr: SocketAddr,
        coordinator: Arc<Coordinator>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            connection_id,
            addr,
            coordinator,
            registry,
            stream,
        }
    }

    /// Run the connection event loop until the transport closes.
    #[instrument(skip(self), fields(connection_id = %self.connection_id, addr = %self.addr), name = "connection")]
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Client connected");

        let (mut ws_tx, mut ws_rx) = self.stream.split();

        // Outgoing queue: handlers reply here, and fan-out from other
        // connections is routed here once `connect` registers the sender.
        let (outgoing_tx, mut outgoing_rx) =
            mpsc::channel::<ServerEvent>(self.coordinator.limits.outgoing_queue);

        let mut rate_limiter = RateLimiter::new(
            self.coordinator.limits.event_rate_per_second,
            self.coordinator.limits.event_burst,
        );
        let mut session = Session::default();

        loop {
            tokio::select! {
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            if !rate_limiter.check() {
                                metrics::inc_rate_limited();
                                warn!("Rate limit exceeded");
                                let _ = ws_tx
                                    .send(error_frame("floodLimited", "event rate exceeded"))
                                    .await;
                                break;
                            }

                            let event = match serde_json::from_str::<ClientEvent>(&text) {
                                Ok(event) => event,
                                Err(e) => {
                                    debug!(error = %e, "Malformed inbound event");
                                    let _ = ws_tx
                                        .send(error_frame("malformed", &e.to_string()))
                                        .await;
                                    continue;
                                }
                            };

                            let mut ctx = Context {
                                connection_id: &self.connection_id,
                                coordinator: &self.coordinator,
                                sender: &outgoing_tx,
                                session: &mut session,
                            };
                            if let Err(e) = self.registry.dispatch(&mut ctx, &event).await
                                && e.is_fatal()
                            {
                                warn!(error = %e, "Fatal handler error, closing connection");
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            info!("Client closed connection");
                            break;
                        }
                        // tungstenite answers pings internally; other frame
                        // kinds carry nothing for us.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                    }
                }

                Some(event) = outgoing_rx.recv() => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode outbound event");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(WsMessage::Text(json)).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
        }

        // Flush events still queued, final error replies included, then
        // close the write half.
        while let Ok(event) = outgoing_rx.try_recv() {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;

        // Canonical teardown: registry, typing, membership and presence.
        self.coordinator.disconnect(&self.connection_id).await;
        info!("Client disconnected");
        Ok(())
    }
}

fn error_frame(code: &str, context: &str) -> WsMessage {
    let event = ServerEvent::ErrorEvent {
        code: code.to_string(),
        context: context.to_string(),
    };
    WsMessage::Text(serde_json::to_string(&event).unwrap_or_default())
}
