//! Polling with bounded retry
//!
//! Convergence checks are retried at a fixed interval until they pass or a
//! timeout elapses. The loop is written against an injectable clock so the
//! verifier is unit-testable without real delays.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Time source and sleep primitive for the retry loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by tokio's timer
///
/// Reads time through tokio so tests running under a paused runtime see
/// auto-advanced time instead of wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of one polling attempt
pub enum Attempt<T> {
    /// The observed state matches; stop polling
    Converged(T),
    /// The observed state does not match yet
    Mismatch(T),
}

/// Outcome of a bounded retry loop
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Converged(T),
    /// Timeout elapsed; carries the last observation so the caller can
    /// report exactly what never converged
    TimedOut(T),
}

impl<T> PollOutcome<T> {
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            PollOutcome::Converged(v) | PollOutcome::TimedOut(v) => v,
        }
    }
}

/// Run `attempt` repeatedly until it converges or `timeout` elapses,
/// sleeping `interval` between attempts
///
/// The attempt itself may fail hard (backend error), which aborts the loop;
/// a mere mismatch keeps polling. The timeout is cooperative: it stops the
/// waiting, not any in-flight work.
pub async fn retry_till_converged<T, F, Fut, E>(
    clock: &dyn Clock,
    timeout: Duration,
    interval: Duration,
    mut attempt: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Attempt<T>, E>>,
{
    let deadline = clock.now() + timeout;
    let mut tries = 0u32;
    loop {
        tries += 1;
        match attempt().await? {
            Attempt::Converged(observation) => {
                debug!("converged after {} attempt(s)", tries);
                return Ok(PollOutcome::Converged(observation));
            }
            Attempt::Mismatch(observation) => {
                if clock.now() >= deadline {
                    debug!("timed out after {} attempt(s)", tries);
                    return Ok(PollOutcome::TimedOut(observation));
                }
                clock.sleep(interval).await;
            }
        }
    }
}
