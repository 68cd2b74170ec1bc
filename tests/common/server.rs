//! Test server management.
//!
//! Spawns in-process coordinator instances on an ephemeral port for
//! integration testing. Running in-process keeps the tests independent of a
//! prebuilt binary and lets them inject a persistence backend.

use parleyd::auth::GuestProvider;
use parleyd::config::Config;
use parleyd::handlers::Registry;
use parleyd::network::Gateway;
use parleyd::services::spawn_typing_sweeper;
use parleyd::state::Coordinator;
use parleyd::store::{NoOpStore, PersistenceStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A test coordinator instance.
pub struct TestServer {
    addr: SocketAddr,
    pub coordinator: Arc<Coordinator>,
    gateway_task: JoinHandle<anyhow::Result<()>>,
    sweeper_task: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a coordinator with the no-op store.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_store(Arc::new(NoOpStore)).await
    }

    /// Spawn a coordinator backed by the given persistence store.
    pub async fn spawn_with_store(store: Arc<dyn PersistenceStore>) -> anyhow::Result<Self> {
        // Ephemeral port, generous flood limits and a short typing TTL so
        // expiry tests finish quickly.
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "test.coordinator"
            metrics_port = 0

            [listen]
            address = "127.0.0.1:0"

            [[rooms.channels]]
            id = "general"

            [[rooms.channels]]
            id = "random"

            [limits]
            typing_ttl_ms = 200
            typing_sweep_ms = 50
            event_rate_per_second = 1000.0
            event_burst = 1000.0
            "#,
        )?;

        let coordinator = Arc::new(Coordinator::new(&config, store, Arc::new(GuestProvider)));
        let sweeper_task = spawn_typing_sweeper(Arc::clone(&coordinator));

        let registry = Arc::new(Registry::new());
        let gateway =
            Gateway::bind(config.listen.clone(), Arc::clone(&coordinator), registry).await?;
        let addr = gateway.local_addr();
        let gateway_task = tokio::spawn(gateway.run());

        Ok(Self {
            addr,
            coordinator,
            gateway_task,
            sweeper_task,
        })
    }

    /// The bound WebSocket address.
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Connect a new test client and complete registration, draining the
    /// rest of the initial sync (presence snapshot + public room history)
    /// so tests start from an empty event queue.
    pub async fn connect(&self, display_name: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = super::client::TestClient::connect(self.addr).await?;
        client.register(display_name).await?;
        client.recv_event("roomHistory").await?;
        Ok(client)
    }

    /// Connect a raw client without sending `connect`.
    pub async fn connect_raw(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(self.addr).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.gateway_task.abort();
        self.sweeper_task.abort();
    }
}
