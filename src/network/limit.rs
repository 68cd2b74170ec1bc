//! Rate limiting for flood protection.
//!
//! Token bucket per connection: tokens refill at a fixed rate, each inbound
//! event costs one, and an empty bucket rejects the event.

use std::time::Instant;

/// Token bucket rate limiter.
pub struct RateLimiter {
    tokens: f32,
    last_check: Instant,
    rate: f32,
    capacity: f32,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// * `rate` - tokens added per second
    /// * `capacity` - maximum token capacity (burst size)
    pub fn new(rate: f32, capacity: f32) -> Self {
        Self {
            tokens: capacity,
            last_check: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Check whether an event can be processed.
    ///
    /// Returns `true` if allowed (token consumed), `false` if the rate
    /// limit is exceeded.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_check).as_secs_f32();
        self.last_check = now;

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn burst_up_to_capacity_then_reject() {
        let mut limiter = RateLimiter::new(10.0, 5.0);
        for _ in 0..5 {
            assert!(limiter.check());
        }
        assert!(!limiter.check());
    }

    #[test]
    fn tokens_replenish_over_time() {
        let mut limiter = RateLimiter::new(10.0, 5.0);
        for _ in 0..5 {
            limiter.check();
        }
        assert!(!limiter.check());

        sleep(Duration::from_millis(200)); // ~2 tokens
        assert!(limiter.check());
        assert!(limiter.check());
    }
}
