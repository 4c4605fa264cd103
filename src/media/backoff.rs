use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 250;

/// Exponential delay between fetch attempts, capped at eight times the base.
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
}

impl Backoff {
    /// `max_attempts` is the number of retries allowed, not counting the first try.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
        }
    }

    pub fn next(&mut self) -> Duration {
        self.attempt += 1;
        let delay = BACKOFF_BASE_MS * 2u64.pow((self.attempt - 1).min(3));
        Duration::from_millis(delay)
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
