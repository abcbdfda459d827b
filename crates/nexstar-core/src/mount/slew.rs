//! Goto wait policy
//!
//! The hand controller gives no completion event for a goto: the only way to
//! know it finished is to poll `L` until it answers "not slewing". A mount
//! that stalls while still claiming to slew would keep that loop going
//! forever, so the loop is bounded by a [`SlewPolicy`] and can be cut short
//! from another thread with a [`CancelToken`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a goto waits for the mount to stop slewing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlewPolicy {
    /// Sleep between `L` polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Give up (and abort the mount) after this long; `None` waits forever
    pub max_duration_ms: Option<u64>,
}

impl Default for SlewPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            // A full meridian-to-meridian goto at max rate takes about 3 minutes
            max_duration_ms: Some(300_000),
        }
    }
}

impl SlewPolicy {
    /// Poll forever, as the hand controller itself would
    pub fn unbounded() -> Self {
        Self {
            max_duration_ms: None,
            ..Self::default()
        }
    }

    /// Sleep between `L` polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest a goto may keep slewing
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }
}

/// Shared flag used to stop a running goto from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running goto to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel` has been called since the last reset
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm a token for the next goto
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = SlewPolicy::default();
        assert_eq!(policy.poll_interval(), Duration::from_millis(50));
        assert_eq!(policy.max_duration(), Some(Duration::from_secs(300)));
        assert_eq!(SlewPolicy::unbounded().max_duration(), None);
    }

    #[test]
    fn test_policy_from_json() {
        let policy: SlewPolicy = serde_json::from_str(r#"{"max_duration_ms": null}"#).unwrap();
        assert_eq!(policy, SlewPolicy::unbounded());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!other.is_cancelled());
    }
}
