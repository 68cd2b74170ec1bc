//! Test WebSocket client.
//!
//! Speaks the wire protocol as JSON values so the tests exercise the real
//! serialized shape, not the server's internal types.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test chat client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub identity: String,
}

impl TestClient {
    /// Open a WebSocket to a test server.
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(format!("ws://{addr}")).await?;
        Ok(Self {
            ws,
            identity: String::new(),
        })
    }

    /// Send one event as JSON.
    pub async fn send(&mut self, event: Value) -> anyhow::Result<()> {
        self.ws.send(WsMessage::Text(event.to_string())).await?;
        Ok(())
    }

    /// Receive a single event from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive an event with a timeout, skipping non-text frames.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let frame = timeout(remaining, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))?;
            if let WsMessage::Text(text) = frame? {
                return Ok(serde_json::from_str(&text)?);
            }
        }
    }

    /// Receive events until the predicate matches, returning the match.
    /// Non-matching events are discarded.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Value>
    where
        F: FnMut(&Value) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let event = self.recv_timeout(remaining).await?;
            if predicate(&event) {
                return Ok(event);
            }
        }
    }

    /// Receive events until one of the given `type` arrives.
    pub async fn recv_event(&mut self, event_type: &str) -> anyhow::Result<Value> {
        self.recv_until(|e| e["type"] == event_type).await
    }

    /// Assert that no event of the given `type` arrives within `dur`.
    pub async fn assert_no_event(&mut self, event_type: &str, dur: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.recv_timeout(remaining).await {
                Ok(event) if event["type"] == event_type => {
                    anyhow::bail!("unexpected {event_type} event: {event}")
                }
                Ok(_) => continue,
                // Timeout (or close) means the event never arrived.
                Err(_) => return Ok(()),
            }
        }
    }

    /// Register with the coordinator (connect + welcome).
    pub async fn register(&mut self, display_name: &str) -> anyhow::Result<()> {
        self.send(json!({"type": "connect", "displayName": display_name}))
            .await?;
        let welcome = self.recv_event("welcome").await?;
        self.identity = welcome["identity"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("welcome without identity"))?
            .to_string();
        Ok(())
    }

    /// Send a public room message.
    pub async fn send_public(&mut self, content: &str) -> anyhow::Result<()> {
        self.send(json!({"type": "send", "content": content, "roomKind": "public"}))
            .await
    }

    /// Send a channel message.
    pub async fn send_channel(&mut self, channel: &str, content: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "send",
            "content": content,
            "roomKind": "channel",
            "target": channel,
        }))
        .await
    }

    /// Send a private message to another identity.
    pub async fn send_private(&mut self, other: &str, content: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "send",
            "content": content,
            "roomKind": "private",
            "target": other,
        }))
        .await
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
