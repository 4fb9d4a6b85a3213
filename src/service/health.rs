use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracks whether the storage backend is answering hire commits.
///
/// Consecutive commit failures mark the backend degraded once they reach the
/// threshold; the next successful commit resets it.
#[derive(Debug)]
pub struct BackendHealth {
    threshold: u32,
    consecutive_failures: AtomicU32,
    last_failure: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub degraded: bool,
    #[serde(rename = "consecutiveFailures")]
    pub consecutive_failures: u32,
    #[serde(rename = "lastFailureAt")]
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl BackendHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            last_failure: Mutex::new(None),
        }
    }

    pub fn record_success(&self) {
        let previous = self.consecutive_failures.swap(0, Ordering::SeqCst);
        if previous >= self.threshold {
            tracing::info!("✅ Storage backend recovered after {} failures", previous);
        }
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());

        if failures == self.threshold {
            tracing::warn!("⚠️  Storage backend degraded after {} consecutive failures", failures);
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures.load(Ordering::SeqCst) >= self.threshold
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            degraded: self.is_degraded(),
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
            last_failure_at: *self
                .last_failure
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}
