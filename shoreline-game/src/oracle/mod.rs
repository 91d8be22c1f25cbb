//! Boundary to the external text-generation service.
//!
//! The core only needs `invoke(prompt, system_prompt) -> text`; transports
//! live in the runner, and tests substitute deterministic stubs.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_CAP_SECS, DEFAULT_EMPTY_BACKOFF_SECS,
    DEFAULT_MAX_ATTEMPTS,
};

mod invoker;

pub use invoker::OracleInvoker;

/// Which part of the tick a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleRole {
    Decision,
    Arbitration,
    Environment,
    EventArbitration,
}

impl OracleRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Arbitration => "arbitration",
            Self::Environment => "environment",
            Self::EventArbitration => "event_arbitration",
        }
    }
}

impl fmt::Display for OracleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered prompt ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub role: OracleRole,
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Overrides the policy's attempt budget for this call.
    pub max_attempts: Option<u32>,
}

impl OracleRequest {
    #[must_use]
    pub fn new(role: OracleRole, prompt: impl Into<String>) -> Self {
        Self {
            role,
            prompt: prompt.into(),
            system_prompt: None,
            max_attempts: None,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Failure reported by a concrete oracle for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unusable payload: {0}")]
    Payload(String),
}

/// A single text-generation capability.
pub trait Oracle {
    /// Make exactly one attempt. Retries belong to [`OracleInvoker`].
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the call fails or the payload is unusable.
    fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError>;
}

impl<T: Oracle + ?Sized> Oracle for &T {
    fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        (**self).invoke(request)
    }
}

impl<T: Oracle + ?Sized> Oracle for Box<T> {
    fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        (**self).invoke(request)
    }
}

/// Why an individual attempt did not produce usable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum FailureKind {
    Transport(String),
    EmptyResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport failure ({message})"),
            Self::EmptyResponse => f.write_str("empty response"),
        }
    }
}

/// Fatal outcome of a retried invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("oracle gave no usable response after {attempts} attempts; last failure: {last_failure}")]
    Exhausted {
        attempts: u32,
        last_failure: FailureKind,
    },
    #[error("oracle call cancelled")]
    Cancelled,
}

/// Attempt budget and backoff for both retry tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_max_attempts")]
    pub max_attempts: u32,
    /// First transport backoff, doubled per failed attempt.
    #[serde(default = "RetryPolicy::default_backoff_base")]
    pub backoff_base: Duration,
    #[serde(default = "RetryPolicy::default_backoff_cap")]
    pub backoff_cap: Duration,
    /// Fixed wait after a blank response.
    #[serde(default = "RetryPolicy::default_empty_backoff")]
    pub empty_backoff: Duration,
}

impl RetryPolicy {
    const fn default_max_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    const fn default_backoff_base() -> Duration {
        Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS)
    }

    const fn default_backoff_cap() -> Duration {
        Duration::from_secs(DEFAULT_BACKOFF_CAP_SECS)
    }

    const fn default_empty_backoff() -> Duration {
        Duration::from_secs(DEFAULT_EMPTY_BACKOFF_SECS)
    }

    /// Same waits, different budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Backoff after the transport failure of zero-based `attempt`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_cap)
            .min(self.backoff_cap)
    }

    /// # Errors
    ///
    /// Returns an error for a zero attempt budget or a cap below the base.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.backoff_cap < self.backoff_base {
            return Err(ConfigError::BackoffCapBelowBase {
                base: self.backoff_base,
                cap: self.backoff_cap,
            });
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            backoff_base: Self::default_backoff_base(),
            backoff_cap: Self::default_backoff_cap(),
            empty_backoff: Self::default_empty_backoff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_backoff_doubles_until_cap() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (0..6).map(|a| policy.backoff_for(a).as_secs()).collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 10, 10]);
        assert_eq!(policy.backoff_for(200), Duration::from_secs(10));
    }

    #[test]
    fn policy_validation() {
        assert_eq!(RetryPolicy::default().validate(), Ok(()));
        assert_eq!(
            RetryPolicy::default().with_max_attempts(0).validate(),
            Err(ConfigError::NoAttempts)
        );
        let inverted = RetryPolicy {
            backoff_cap: Duration::from_millis(10),
            ..RetryPolicy::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::BackoffCapBelowBase { .. })
        ));
    }

    #[test]
    fn failure_kind_reads_well() {
        let err = InvokeError::Exhausted {
            attempts: 3,
            last_failure: FailureKind::EmptyResponse,
        };
        assert_eq!(
            err.to_string(),
            "oracle gave no usable response after 3 attempts; last failure: empty response"
        );
    }
}
