//! Retry/backoff classification.
//!
//! A failure is first mapped to a [`FailureClass`], then the unit's
//! [`RetryPolicy`] turns class + attempt number into a [`RetryDecision`].
//!
//! | Class        | Decision                                                  |
//! |--------------|-----------------------------------------------------------|
//! | Fatal        | fail fast                                                 |
//! | Permanent    | fail fast                                                 |
//! | RateLimited  | exponential backoff, honoring a larger `Retry-After`      |
//! | Transient    | fixed `initial_interval` delay                            |
//! | Unknown      | one immediate retry, then fail                            |
//!
//! Every delay is capped at `max_interval` and every class at `max_attempts`.

use agentflow_core::error::{Error, ProviderError, ToolError};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What kind of failure happened, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying cannot help and the execution should stop (bad credentials, no quota)
    Fatal,
    RateLimited { retry_after: Option<Duration> },
    /// Likely to succeed on a later attempt (5xx, network, per-attempt timeout)
    Transient,
    /// The request itself is wrong (bad arguments, unknown tool)
    Permanent,
    Unknown,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureClass::Fatal | FailureClass::Permanent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryWithBackoff(Duration),
    RetryImmediately,
    FailFast,
}

/// Maps an error onto a [`FailureClass`].
pub trait Classify {
    fn classify(&self) -> FailureClass;
}

impl Classify for ProviderError {
    fn classify(&self) -> FailureClass {
        match self {
            ProviderError::AuthenticationFailed(_)
            | ProviderError::QuotaExceeded(_)
            | ProviderError::NotConfigured(_) => FailureClass::Fatal,
            ProviderError::RateLimited { retry_after_secs } => FailureClass::RateLimited {
                retry_after: retry_after_secs.map(Duration::from_secs),
            },
            ProviderError::ServerError { .. }
            | ProviderError::Network(_)
            | ProviderError::Timeout(_) => FailureClass::Transient,
            ProviderError::ApiError { .. }
            | ProviderError::InvalidResponse(_)
            | ProviderError::Unknown(_) => FailureClass::Unknown,
        }
    }
}

impl Classify for ToolError {
    fn classify(&self) -> FailureClass {
        match self {
            ToolError::NotFound(_)
            | ToolError::NotImplemented(_)
            | ToolError::MalformedArguments { .. }
            | ToolError::InvalidArguments { .. }
            | ToolError::DuplicateCallId { .. } => FailureClass::Permanent,
            ToolError::Unavailable { .. } | ToolError::Timeout { .. } => FailureClass::Transient,
            ToolError::ExecutionFailed { .. } => FailureClass::Unknown,
        }
    }
}

impl Classify for Error {
    fn classify(&self) -> FailureClass {
        match self {
            Error::Provider(e) | Error::ModelCall { source: e, .. } => e.classify(),
            Error::Tool(e) => e.classify(),
            Error::InvalidRequest(_) | Error::ToolConversion(_) => FailureClass::Permanent,
            Error::Cancelled
            | Error::ExecutionTimeout { .. }
            | Error::NonDeterminism { .. }
            | Error::Config { .. } => FailureClass::Fatal,
            Error::Unit { .. } | Error::Serialization(_) | Error::Internal(_) => {
                FailureClass::Unknown
            }
        }
    }
}

/// How often and how patiently a unit is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff_coefficient: f64,
}

impl RetryPolicy {
    pub fn new(initial_interval: Duration, max_interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval,
            max_interval,
            max_attempts,
            backoff_coefficient: 2.0,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1)
    }

    /// `initial × coefficient^(attempt-1)`, capped at `max_interval`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis =
            self.initial_interval.as_millis() as f64 * self.backoff_coefficient.powi(exponent);
        let cap = self.max_interval.as_millis() as f64;
        if !millis.is_finite() || millis >= cap {
            self.max_interval
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    /// Decide what to do after `attempt` (1-based) failed with `class`.
    pub fn decide(&self, class: FailureClass, attempt: u32) -> RetryDecision {
        if !class.is_retryable() || attempt >= self.max_attempts {
            return RetryDecision::FailFast;
        }
        match class {
            FailureClass::RateLimited { retry_after } => {
                let delay = match retry_after {
                    Some(hint) => self.backoff(attempt).max(hint),
                    None => self.backoff(attempt),
                };
                RetryDecision::RetryWithBackoff(delay.min(self.max_interval))
            }
            FailureClass::Transient => {
                RetryDecision::RetryWithBackoff(self.initial_interval.min(self.max_interval))
            }
            FailureClass::Unknown if attempt == 1 => RetryDecision::RetryImmediately,
            _ => RetryDecision::FailFast,
        }
    }
}

/// Why a retried operation finally gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryFailure<E> {
    /// Every permitted attempt failed; `error` is the last one
    Exhausted { error: E, attempts: u32 },
    /// A non-retryable failure
    Fatal { error: E, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<E> RetryFailure<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Exhausted { attempts, .. }
            | RetryFailure::Fatal { attempts, .. }
            | RetryFailure::Cancelled { attempts } => *attempts,
        }
    }
}

/// Run `op` until it succeeds, the policy says stop, or `cancel` fires.
///
/// `op` receives the 1-based attempt number. Cancellation interrupts both a
/// running attempt and a backoff sleep.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    unit: &str,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Classify + fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryFailure::Cancelled { attempts: attempt });
        }
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryFailure::Cancelled { attempts: attempt }),
            outcome = op(attempt) => outcome,
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(unit, attempt, "Unit succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let class = error.classify();
        match policy.decide(class, attempt) {
            RetryDecision::FailFast => {
                warn!(unit, attempt, error = %error, class = ?class, "Unit failed, not retrying");
                return Err(if class.is_retryable() {
                    RetryFailure::Exhausted {
                        error,
                        attempts: attempt,
                    }
                } else {
                    RetryFailure::Fatal {
                        error,
                        attempts: attempt,
                    }
                });
            }
            RetryDecision::RetryImmediately => {
                debug!(unit, attempt, error = %error, "Retrying immediately");
            }
            RetryDecision::RetryWithBackoff(delay) => {
                debug!(
                    unit,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after backoff"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RetryFailure::Cancelled { attempts: attempt }),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
