//! Timed retry loop for waiting on asynchronous provider work.
//!
//! [`poll_until`] calls a probe, sleeps for the policy interval between
//! attempts, and gives up once the overall timeout or attempt cap is hit.
//! The delay is a Tokio timer, so dropping the returned future cancels the
//! wait at the next suspension point.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Default delay between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default overall budget for a polling loop.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Bounds applied to a polling loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay between consecutive probes.
    pub interval: Duration,
    /// Overall time budget measured from the first probe.
    pub timeout: Duration,
    /// Optional cap on the number of probes.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            max_attempts: None,
        }
    }
}

/// Observation returned by a probe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollStep<T> {
    /// The awaited condition holds; polling stops with this value.
    Ready(T),
    /// The condition does not hold yet. The description is kept for
    /// timeout reporting.
    Pending(String),
}

/// Successful polling result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Polled<T> {
    /// Value produced by the final probe.
    pub value: T,
    /// Number of probes performed, including the final one.
    pub attempts: u32,
}

/// Reasons a polling loop ends without a ready value.
#[derive(Debug, Error)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    /// The probe itself failed; polling stops immediately.
    #[error(transparent)]
    Probe(E),
    /// The timeout or attempt cap was reached while still pending.
    #[error(
        "gave up after {attempts} attempts in {}s (last observation: {})",
        .elapsed.as_secs(),
        .last_observation.as_deref().unwrap_or("none")
    )]
    Exhausted {
        /// Number of probes performed.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
        /// Description attached to the last pending observation.
        last_observation: Option<String>,
    },
}

/// Repeatedly runs `probe` until it reports [`PollStep::Ready`], fails, or
/// the policy budget is spent.
///
/// The probe receives the 1-based attempt number. No sleep happens before
/// the first probe or after the last one.
///
/// # Errors
///
/// Returns [`PollError::Probe`] when the probe fails and
/// [`PollError::Exhausted`] when the timeout or attempt cap is reached.
pub async fn poll_until<T, E, F, Fut>(
    policy: &PollPolicy,
    mut probe: F,
) -> Result<Polled<T>, PollError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStep<T>, E>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut attempts: u32 = 0;
    let mut last_observation = None;

    loop {
        attempts = attempts.saturating_add(1);
        match probe(attempts).await.map_err(PollError::Probe)? {
            PollStep::Ready(value) => return Ok(Polled { value, attempts }),
            PollStep::Pending(observation) => last_observation = Some(observation),
        }

        let attempts_spent = policy.max_attempts.is_some_and(|max| attempts >= max);
        if attempts_spent || Instant::now() + policy.interval > deadline {
            return Err(PollError::Exhausted {
                attempts,
                elapsed: started.elapsed(),
                last_observation,
            });
        }

        sleep(policy.interval).await;
    }
}
