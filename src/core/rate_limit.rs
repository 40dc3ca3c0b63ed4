use crate::utils::error::{RelayError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Per-id write debounce. Appends for the same id inside the window are
/// rejected; different ids never interfere. A zero window disables it.
#[derive(Debug)]
pub struct WriteLimiter {
    window: Duration,
    last_write: DashMap<String, Instant>,
}

impl WriteLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_write: DashMap::new(),
        }
    }

    pub fn check(&self, id: &str) -> Result<()> {
        if self.window.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        match self.last_write.entry(id.to_string()) {
            Entry::Occupied(mut seen) => {
                let elapsed = now.duration_since(*seen.get());
                if elapsed < self.window {
                    let retry_after_ms = (self.window - elapsed).as_millis() as u64;
                    return Err(RelayError::RateLimited {
                        id: id.to_string(),
                        retry_after_ms,
                    });
                }
                seen.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        Ok(())
    }
}
