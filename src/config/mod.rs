//! Configuration loading and management.
//!
//! Split into logical submodules:
//! - [`types`]: Core config structs (Config, ServerConfig) and loading
//! - [`listen`]: Network listener configuration
//! - [`rooms`]: Channel set and history capacities
//! - [`limits`]: Typing expiry, queue depths, flood limits

mod limits;
mod listen;
mod rooms;
mod types;

pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use rooms::{ChannelBlock, RoomsConfig};
pub use types::{Config, ConfigError, ServerConfig};
