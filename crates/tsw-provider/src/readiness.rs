//! Fixed-interval wait for a freshly created entity to become ready.
//!
//! The wait moves `Pending -> Polling -> {Ready | Cancelled | TimedOut}`.
//! A failing status query ends the wait immediately with that error; it is
//! never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Shortest spacing between two status queries.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before the first query and between queries.
    pub interval: Duration,
    /// Give up after this long. `None` waits until ready or cancelled.
    pub timeout: Option<Duration>,
}

/// How a wait ended when no query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The last queried value satisfied the readiness check.
    Ready(T),
    /// The caller cancelled. The entity's final state is unknown.
    Cancelled,
    /// The configured timeout elapsed first.
    TimedOut,
}

/// Query `query` every `config.interval` until `is_ready` accepts a value.
///
/// Cancellation and the timeout are observed while waiting between ticks
/// as well as while a query is in flight. A zero interval is raised to
/// [`MIN_INTERVAL`].
pub async fn wait_until<T, E, F, Fut, P>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut query: F,
    is_ready: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let interval = config.interval.max(MIN_INTERVAL);
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = config.timeout.map(|t| started + t);
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expired);

    trace!(?interval, timeout = ?config.timeout, "readiness poll started");

    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(attempt, "readiness poll cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            () = &mut expired => {
                warn!(attempt, waited = ?started.elapsed(), "readiness poll timed out");
                return Ok(PollOutcome::TimedOut);
            }
            _ = ticker.tick() => {}
        }

        attempt += 1;
        debug!(attempt, "readiness poll query");

        let value = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(attempt, "readiness poll cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            () = &mut expired => {
                warn!(attempt, waited = ?started.elapsed(), "readiness poll timed out");
                return Ok(PollOutcome::TimedOut);
            }
            result = query() => result?,
        };

        if is_ready(&value) {
            trace!(attempt, "readiness poll complete");
            return Ok(PollOutcome::Ready(value));
        }
    }
}
