//! Network layer: WebSocket gateway and per-connection tasks.

mod connection;
mod gateway;
mod limit;

pub use connection::Connection;
pub use gateway::Gateway;
pub use limit::RateLimiter;
