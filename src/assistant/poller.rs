//! Bounded polling of an assistant run.

use std::time::Duration;

use crate::assistant::{AssistantProvider, Run, RunError, RunStatus};
use crate::error::ProviderError;

/// Wait between two status checks of a run.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Status checks made before a still-pending run is abandoned.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Fixed-interval polling bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// Worst-case time spent waiting on one run.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// How a polled run finished. `attempts` counts status checks after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { attempts: u32 },
    Failed { error: Option<RunError>, attempts: u32 },
    TimedOut { attempts: u32 },
    /// Stopped in a non-pending status other than completed or failed.
    Ended { status: RunStatus, attempts: u32 },
}

#[derive(Debug)]
enum PollState {
    Submitted(Run),
    Polling { attempts: u32 },
    Done(PollOutcome),
}

/// Drives one run from creation to a terminal outcome.
pub struct RunPoller<'a> {
    provider: &'a dyn AssistantProvider,
    thread_id: &'a str,
    policy: PollPolicy,
}

impl<'a> RunPoller<'a> {
    pub fn new(provider: &'a dyn AssistantProvider, thread_id: &'a str, policy: PollPolicy) -> Self {
        Self {
            provider,
            thread_id,
            policy,
        }
    }

    /// Poll `run` until it leaves the pending statuses or the attempt ceiling
    /// is reached. Each attempt sleeps one interval, then re-reads the run.
    pub async fn wait(&self, run: Run) -> Result<PollOutcome, ProviderError> {
        let run_id = run.id.clone();
        let mut state = PollState::Submitted(run);

        loop {
            state = match state {
                PollState::Submitted(run) => observe(&run, 0),
                PollState::Polling { attempts } if attempts >= self.policy.max_attempts => {
                    PollState::Done(PollOutcome::TimedOut { attempts })
                }
                PollState::Polling { attempts } => {
                    tokio::time::sleep(self.policy.interval).await;
                    let run = self.provider.retrieve_run(self.thread_id, &run_id).await?;
                    tracing::debug!(
                        thread_id = self.thread_id,
                        run_id = %run_id,
                        attempt = attempts + 1,
                        status = %run.status,
                        "Polled assistant run"
                    );
                    observe(&run, attempts + 1)
                }
                PollState::Done(outcome) => return Ok(outcome),
            };
        }
    }
}

fn observe(run: &Run, attempts: u32) -> PollState {
    match &run.status {
        RunStatus::Completed => PollState::Done(PollOutcome::Completed { attempts }),
        RunStatus::Failed => PollState::Done(PollOutcome::Failed {
            error: run.last_error.clone(),
            attempts,
        }),
        status if status.is_pending() => PollState::Polling { attempts },
        status => PollState::Done(PollOutcome::Ended {
            status: status.clone(),
            attempts,
        }),
    }
}
