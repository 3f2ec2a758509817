//! Adaptive status polling for one submitted job. The wait between polls
//! is the single suspension point of the whole lifecycle and the only
//! place a cancellation can land.

use std::cmp;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PollPolicy;
use crate::error::PollError;
use crate::job::{JobHandle, JobStatus};
use crate::service::NeosService;
use crate::stream::OutputStream;

/// How one polling loop ended, short of a poll-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job reached a terminal status.
    Terminal(JobStatus),
    /// The caller cancelled while waiting; the job is still live
    /// server-side and the engine should try to kill it.
    Cancelled,
}

/// Poll `handle` until it reaches a terminal state, the policy budget
/// runs out, or `cancel` fires.
///
/// Backoff doubles from the policy's initial interval while the status
/// is unchanged, capped at the policy maximum, and snaps back to the
/// minimum the moment the status moves. Partial output is pulled through
/// `stream` into `sink` on every successful poll; stream trouble is
/// logged, never fatal. Transport failures are tolerated up to the
/// policy's consecutive bound, then escalated.
pub async fn poll_to_terminal<S, W>(
    service: &S,
    handle: &JobHandle,
    policy: &PollPolicy,
    stream: &mut OutputStream,
    sink: &mut W,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError>
where
    S: NeosService + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    // The service queues every accepted job before running it.
    let mut last_status = JobStatus::Queued;
    let mut wait = policy.initial_interval;
    let mut consecutive_failures: u32 = 0;

    loop {
        if started.elapsed() > policy.budget {
            return Err(PollError::BudgetExceeded(policy.budget));
        }

        match service.job_status(handle).await {
            Ok(JobStatus::Unknown) => {
                // Expired job or wrong token; retrying cannot fix this.
                return Err(PollError::JobNotFound);
            }
            Ok(status) => {
                consecutive_failures = 0;

                if status != last_status {
                    debug!(job = handle.number, %status, "status changed");
                    wait = policy.initial_interval;
                    last_status = status;
                } else {
                    wait = cmp::min(saturating_double(wait), policy.max_interval);
                }

                if let Err(e) = stream.fetch_new(service, handle, sink).await {
                    warn!(job = handle.number, error = %e, "partial output fetch failed");
                }

                if status.is_terminal() {
                    return Ok(PollOutcome::Terminal(status));
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!(
                    job = handle.number,
                    attempt = consecutive_failures,
                    error = %e,
                    "status poll failed"
                );
                if consecutive_failures >= policy.max_transport_failures {
                    return Err(PollError::TransportExhausted {
                        attempts: consecutive_failures,
                        last: e,
                    });
                }
                wait = cmp::min(saturating_double(wait), policy.max_interval);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            _ = sleep(wait) => {}
        }
    }
}

fn saturating_double(wait: Duration) -> Duration {
    wait.checked_mul(2).unwrap_or(Duration::MAX)
}
