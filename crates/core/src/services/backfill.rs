use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::api::DashboardApi;
use crate::client::transport::HttpTransport;
use crate::errors::DashboardError;
use crate::models::backfill::BackfillStatus;
use crate::services::gate::BusyGate;

/// Pacing of backfill status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillPolicy {
    pub poll_interval: Duration,
    /// Extra polls allowed right after submission while the job has not
    /// reported `running` yet.
    pub grace_polls: u32,
}

impl Default for BackfillPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            grace_polls: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackfillOutcome {
    Succeeded { message: String },
    Failed { message: String },
}

impl BackfillOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, BackfillOutcome::Succeeded { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            BackfillOutcome::Succeeded { message } | BackfillOutcome::Failed { message } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStep {
    /// Poll again after the interval.
    Continue,
    Finished(BackfillOutcome),
}

/// Decides, status by status, whether a submitted job is done.
///
/// A job that is not running yet is given `grace_polls` more looks before
/// its stop is taken as final. Once it has been seen running the grace is
/// spent, so the first stopped status afterwards finishes it.
#[derive(Debug, Clone)]
pub struct BackfillMonitor {
    grace_remaining: u32,
    polls: u32,
}

impl BackfillMonitor {
    pub fn new(policy: &BackfillPolicy) -> Self {
        Self {
            grace_remaining: policy.grace_polls,
            polls: 0,
        }
    }

    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls
    }

    #[must_use]
    pub fn grace_remaining(&self) -> u32 {
        self.grace_remaining
    }

    pub fn observe(&mut self, status: &BackfillStatus) -> MonitorStep {
        self.polls += 1;
        if status.running {
            self.grace_remaining = 0;
            return MonitorStep::Continue;
        }
        if self.grace_remaining > 0 {
            self.grace_remaining -= 1;
            return MonitorStep::Continue;
        }
        let message = status.message.clone();
        MonitorStep::Finished(if status.reports_failure() {
            BackfillOutcome::Failed { message }
        } else {
            BackfillOutcome::Succeeded { message }
        })
    }
}

/// Submits backfill jobs and follows them to completion, one at a time.
#[derive(Debug, Default)]
pub struct BackfillRunner {
    policy: BackfillPolicy,
    gate: BusyGate,
}

impl BackfillRunner {
    pub fn new(policy: BackfillPolicy) -> Self {
        Self {
            policy,
            gate: BusyGate::new(),
        }
    }

    /// `true` while a job is being monitored.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.gate.is_busy()
    }

    /// Submit a backfill for `start..=end` and poll its status until it
    /// finishes. A second call while one is in progress is rejected.
    pub async fn run<T: HttpTransport>(
        &self,
        api: &DashboardApi<T>,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<BackfillOutcome, DashboardError> {
        let Some(_permit) = self.gate.try_acquire() else {
            return Err(DashboardError::Validation(
                "a backfill job is already running".to_string(),
            ));
        };

        let reply = api.backfill_range(start, end, today).await?;
        info!(%start, %end, message = %reply.message, "backfill submitted");

        let mut monitor = BackfillMonitor::new(&self.policy);
        loop {
            let status = match api.backfill_status().await {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "backfill status polling failed");
                    return Err(e);
                }
            };
            match monitor.observe(&status) {
                MonitorStep::Continue => {
                    info!(
                        running = status.running,
                        grace = monitor.grace_remaining(),
                        message = %status.message,
                        "backfill in progress"
                    );
                    tokio::time::sleep(self.policy.poll_interval).await;
                }
                MonitorStep::Finished(outcome) => {
                    info!(
                        polls = monitor.polls(),
                        success = outcome.is_success(),
                        message = outcome.message(),
                        "backfill finished"
                    );
                    return Ok(outcome);
                }
            }
        }
    }
}
