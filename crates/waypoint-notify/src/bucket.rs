//! Outbound send-rate limiter: a token bucket refilled
//! continuously from elapsed wall-clock time, so it behaves correctly
//! regardless of how often the caller happens to poll it.

use std::time::Instant;

pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    rate_per_s: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_s: u32) -> Self {
        let rate = rate_per_s.max(1) as f64;
        Self {
            capacity: rate,
            tokens: rate,
            rate_per_s: rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_s).min(self.capacity);
        self.last_refill = now;
    }

    /// Takes one token if available. Callers that fail to acquire one must
    /// defer the send to a later poll rather than sending anyway.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
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

    #[test]
    fn starts_full_and_drains_under_capacity() {
        let mut bucket = TokenBucket::new(3);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn refills_over_time() {
        let mut bucket = TokenBucket::new(1_000_000);
        bucket.try_acquire();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(bucket.try_acquire());
    }
}
