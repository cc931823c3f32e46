use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::errors::DashboardError;

/// Retry ceiling and pacing of the resilient client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a request is tried at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Deadline of a single attempt; the call is dropped when it expires.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 150,
            retry_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Why the client is retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPhase {
    TimedOut,
    ConnectionFailed,
}

impl RetryPhase {
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            RetryPhase::TimedOut => "Connection timed out, retrying...",
            RetryPhase::ConnectionFailed => "Connection failed, retrying...",
        }
    }
}

/// State of the shared connection indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Hidden,
    /// `retry` is the number of the retry about to be made, from 1.
    Retrying {
        retry: u32,
        max_retries: u32,
        phase: RetryPhase,
    },
    Failed {
        message: String,
    },
}

impl ConnectionStatus {
    /// `"3/150"`-style counter, when retrying.
    #[must_use]
    pub fn counter(&self) -> Option<String> {
        match self {
            ConnectionStatus::Retrying {
                retry, max_retries, ..
            } => Some(format!("{retry}/{max_retries}")),
            _ => None,
        }
    }
}

/// Receives every connection-status change.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: &ConnectionStatus);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StatusObserver for NoopObserver {
    fn on_status(&self, _status: &ConnectionStatus) {}
}

enum Failure {
    Timeout,
    Network(String),
    Http(u16),
}

impl Failure {
    fn phase(&self) -> RetryPhase {
        match self {
            Failure::Timeout => RetryPhase::TimedOut,
            Failure::Network(_) | Failure::Http(_) => RetryPhase::ConnectionFailed,
        }
    }

    fn into_error(self, url: &str, attempts: u32) -> DashboardError {
        let url = url.to_string();
        match self {
            Failure::Timeout => DashboardError::Timeout { url, attempts },
            Failure::Network(message) => DashboardError::Unreachable {
                url,
                attempts,
                message,
            },
            Failure::Http(status) => DashboardError::Http {
                url,
                status,
                attempts,
            },
        }
    }
}

/// Wraps a transport with per-attempt deadlines and a fixed-delay retry
/// loop. Fails only once the retry ceiling is spent.
pub struct ResilientClient<T: HttpTransport> {
    transport: T,
    policy: RetryPolicy,
    observer: Arc<dyn StatusObserver>,
}

impl<T: HttpTransport> ResilientClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A single attempt under the per-attempt deadline. Leaves the status
    /// indicator alone; used for background chatter such as debug logs.
    pub async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse, DashboardError> {
        let outcome =
            tokio::time::timeout(self.policy.attempt_timeout, self.transport.execute(request)).await;
        let failure = match outcome {
            Ok(Ok(response)) if response.is_success() => return Ok(response),
            Ok(Ok(response)) => Failure::Http(response.status),
            Ok(Err(TransportError::Timeout)) | Err(_) => Failure::Timeout,
            Ok(Err(TransportError::Network(message))) => Failure::Network(message),
        };
        Err(failure.into_error(&request.url, 1))
    }

    /// Send `request` until a 2xx response arrives or retries run out.
    ///
    /// Timeouts, network failures and non-2xx responses all take the same
    /// retry path; they differ only in the terminal error.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, DashboardError> {
        let max_retries = self.policy.max_retries;
        let mut attempt: u32 = 1;

        loop {
            let outcome =
                tokio::time::timeout(self.policy.attempt_timeout, self.transport.execute(request))
                    .await;
            let failure = match outcome {
                Ok(Ok(response)) if response.is_success() => {
                    if attempt > 1 {
                        debug!(url = %request.url, attempt, "request recovered");
                    }
                    self.observer.on_status(&ConnectionStatus::Hidden);
                    return Ok(response);
                }
                Ok(Ok(response)) => Failure::Http(response.status),
                Ok(Err(TransportError::Timeout)) | Err(_) => Failure::Timeout,
                Ok(Err(TransportError::Network(message))) => Failure::Network(message),
            };

            // Retries already made: attempt - 1.
            if attempt > max_retries {
                let err = failure.into_error(&request.url, attempt);
                error!(url = %request.url, attempts = attempt, error = %err, "retries exhausted");
                self.observer.on_status(&ConnectionStatus::Failed {
                    message: err.user_message(),
                });
                return Err(err);
            }

            let phase = failure.phase();
            warn!(
                url = %request.url,
                retry = attempt,
                max_retries,
                phase = phase.message(),
                "request failed, retrying"
            );
            self.observer.on_status(&ConnectionStatus::Retrying {
                retry: attempt,
                max_retries,
                phase,
            });
            tokio::time::sleep(self.policy.retry_delay).await;
            attempt += 1;
        }
    }
}
