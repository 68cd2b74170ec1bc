//! Typing expiry, queue depths and flood limits.

use serde::Deserialize;

/// Runtime limits configuration.
///
/// These limits keep one slow or abusive connection from backing up the
/// coordinator: the outgoing queue bounds per-connection memory, and the
/// token bucket bounds inbound event rate.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Milliseconds of inactivity before a typing indicator expires
    /// (default: 1000).
    #[serde(default = "default_typing_ttl_ms")]
    pub typing_ttl_ms: u64,
    /// Sweep interval for expired typing indicators (default: 250).
    #[serde(default = "default_typing_sweep_ms")]
    pub typing_sweep_ms: u64,
    /// Per-connection outgoing event queue depth (default: 64).
    /// Events to a connection whose queue is full are dropped, not awaited.
    #[serde(default = "default_outgoing_queue")]
    pub outgoing_queue: usize,
    /// Sustained inbound events per second per connection (default: 10.0).
    #[serde(default = "default_event_rate_per_second")]
    pub event_rate_per_second: f32,
    /// Inbound event burst capacity per connection (default: 20.0).
    #[serde(default = "default_event_burst")]
    pub event_burst: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            typing_ttl_ms: default_typing_ttl_ms(),
            typing_sweep_ms: default_typing_sweep_ms(),
            outgoing_queue: default_outgoing_queue(),
            event_rate_per_second: default_event_rate_per_second(),
            event_burst: default_event_burst(),
        }
    }
}

fn default_typing_ttl_ms() -> u64 {
    1000
}

fn default_typing_sweep_ms() -> u64 {
    250
}

fn default_outgoing_queue() -> usize {
    64
}

fn default_event_rate_per_second() -> f32 {
    10.0
}

fn default_event_burst() -> f32 {
    20.0
}
