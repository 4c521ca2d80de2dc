//! Retry wrapper for lock/busy contention.
//!
//! Only [`StoreError::Locked`] is retried. Each wait is the base delay plus
//! a random share of it, with no growth between attempts.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// How often and how long to wait on a locked store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps; for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
        }
    }

    /// `base * (1 + jitter)` with jitter in `[0, 1)`.
    pub fn jittered_delay(&self) -> Duration {
        let base = self.base_delay_ms as f64;
        let jitter: f64 = rand::random();
        Duration::from_millis((base * (1.0 + jitter)) as u64)
    }
}

/// Run `op` until it succeeds, fails with a non-contention error, or the
/// attempts run out. Exhaustion yields [`StoreError::Busy`].
pub async fn retry_on_busy<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match op().await {
            Err(err) if err.is_contention() => {
                if attempt == attempts {
                    warn!("{label}: store still locked after {attempts} attempts");
                    break;
                }
                let delay = policy.jittered_delay();
                debug!(
                    "{label}: attempt {attempt}/{attempts} hit contention ({err}), retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }

    Err(StoreError::Busy { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked_then_ok(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(StoreError::Locked("database is locked".into())))
            } else {
                std::future::ready(Ok("done"))
            }
        }
    }

    #[test]
    fn test_jittered_delay_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.jittered_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_locks() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_on_busy(
            RetryPolicy::immediate(10),
            "upsert",
            locked_then_ok(3, calls.clone()),
        )
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_busy() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = retry_on_busy(
            RetryPolicy::immediate(10),
            "upsert",
            locked_then_ok(u32::MAX, calls.clone()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Busy { attempts: 10 }));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = retry_on_busy(RetryPolicy::immediate(10), "delete", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err::<(), _>(StoreError::Validation("bad".into())))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
