use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CooldownCheck {
    Ready,
    Cooling { remaining: Duration },
}

/// Per-sender "last used" timestamps for a throttled command.
///
/// Entries are never pruned; the map grows with the number of distinct users.
pub struct CooldownTracker {
    window: Mutex<Duration>,
    last_usage: Mutex<HashMap<String, Instant>>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window: Mutex::new(window),
            last_usage: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_window(&self, window: Duration) {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = window;
    }

    pub fn check(&self, user: &str) -> CooldownCheck {
        let window = self.window();
        let last_usage = self.last_usage.lock().unwrap_or_else(PoisonError::into_inner);
        match last_usage.get(user) {
            Some(last) => {
                let elapsed = last.elapsed();
                if elapsed < window {
                    CooldownCheck::Cooling {
                        remaining: window - elapsed,
                    }
                } else {
                    CooldownCheck::Ready
                }
            }
            None => CooldownCheck::Ready,
        }
    }

    pub fn record(&self, user: &str) {
        self.last_usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_window() {
        let tracker = CooldownTracker::new(Duration::from_secs(60));
        assert_eq!(tracker.check("u1"), CooldownCheck::Ready);

        tracker.record("u1");
        tokio::time::advance(Duration::from_secs(20)).await;
        match tracker.check("u1") {
            CooldownCheck::Cooling { remaining } => assert_eq!(remaining, Duration::from_secs(40)),
            other => panic!("expected cooling, got {:?}", other),
        }
        // Other users are unaffected.
        assert_eq!(tracker.check("u2"), CooldownCheck::Ready);

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(tracker.check("u1"), CooldownCheck::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_window_applies_to_existing_entries() {
        let tracker = CooldownTracker::new(Duration::from_secs(60));
        tracker.record("u1");
        tokio::time::advance(Duration::from_secs(10)).await;
        tracker.set_window(Duration::from_secs(5));
        assert_eq!(tracker.window(), Duration::from_secs(5));
        assert_eq!(tracker.check("u1"), CooldownCheck::Ready);
    }
}
