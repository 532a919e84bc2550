//! Bounded retry with linear backoff.
//!
//! Only the first lexicon listing after sign-in is retried. Every other
//! collaborator call is attempted once and its failure surfaced.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{BoxFuture, MaybeSendSync};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay after the first failure; attempt `n` waits `n` times this
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Suspends the caller between attempts.
///
/// Implementations for async hosts should await a timer rather than block,
/// so other work keeps running during the backoff.
pub trait Sleeper: MaybeSendSync {
    /// Resolve after `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Blocks the current thread. For the CLI and other blocking hosts; inside
/// an async runtime it stalls the executor for the whole delay.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

#[cfg(not(target_arch = "wasm32"))]
impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move { std::thread::sleep(duration) })
    }
}

/// Returns immediately. The wasm default, so backoff only happens when the
/// host supplies its own timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Run `op` until it succeeds or `policy.attempts` is exhausted, returning
/// the last error.
pub async fn retry_with_backoff<T, E, F, Fut, S>(
    policy: RetryPolicy,
    sleeper: &S,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: Sleeper + ?Sized,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                log::warn!("{} failed after {} attempt(s): {}", label, attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::block_on_test;
    use crate::test_utils::RecordingSleeper;

    #[test]
    fn test_succeeds_after_failures() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let result: Result<u32, String> = block_on_test(retry_with_backoff(
            RetryPolicy::default(),
            &sleeper,
            "list",
            || {
                calls += 1;
                let n = calls;
                async move { if n < 3 { Err(format!("down {}", n)) } else { Ok(n) } }
            },
        ));
        assert_eq!(result, Ok(3));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn test_returns_last_error_when_exhausted() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let result: Result<(), String> = block_on_test(retry_with_backoff(
            RetryPolicy {
                attempts: 2,
                base_delay_ms: 5,
            },
            &sleeper,
            "list",
            || {
                calls += 1;
                let n = calls;
                async move { Err(format!("down {}", n)) }
            },
        ));
        assert_eq!(result, Err("down 2".to_string()));
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(5)]);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let result: Result<(), &str> = block_on_test(retry_with_backoff(
            RetryPolicy {
                attempts: 0,
                base_delay_ms: 0,
            },
            &NoSleep,
            "list",
            || async { Err("nope") },
        ));
        assert!(result.is_err());
    }
}
