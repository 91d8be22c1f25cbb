use super::{FailureKind, InvokeError, Oracle, OracleRequest, RetryPolicy};
use crate::clock::Clock;
use crate::observer::GameObserver;

/// Wraps an [`Oracle`] with the two layered retry tracks.
///
/// Transport failures back off exponentially up to the cap; blank responses
/// wait a short fixed time. Both draw from one attempt budget, and running
/// out of it is fatal for the caller.
pub struct OracleInvoker<'a> {
    oracle: &'a dyn Oracle,
    clock: &'a dyn Clock,
    observer: &'a dyn GameObserver,
    policy: RetryPolicy,
}

impl<'a> OracleInvoker<'a> {
    #[must_use]
    pub fn new(
        oracle: &'a dyn Oracle,
        clock: &'a dyn Clock,
        observer: &'a dyn GameObserver,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            oracle,
            clock,
            observer,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke until a non-blank response arrives or the budget runs out.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Exhausted`] when every attempt failed and
    /// [`InvokeError::Cancelled`] when a backoff wait was interrupted.
    pub fn invoke(&self, request: &OracleRequest) -> Result<String, InvokeError> {
        let attempts = request
            .max_attempts
            .unwrap_or(self.policy.max_attempts)
            .max(1);
        let mut last_failure = FailureKind::EmptyResponse;
        for attempt in 0..attempts {
            if self.clock.is_cancelled() {
                return Err(InvokeError::Cancelled);
            }
            let wait = match self.oracle.invoke(request) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    last_failure = FailureKind::EmptyResponse;
                    self.policy.empty_backoff
                }
                Err(err) => {
                    last_failure = FailureKind::Transport(err.to_string());
                    self.policy.backoff_for(attempt)
                }
            };
            let has_next = attempt + 1 < attempts;
            self.observer.on_oracle_retry(
                request.role,
                attempt + 1,
                attempts,
                &last_failure,
                has_next.then_some(wait),
            );
            if has_next {
                self.clock
                    .sleep(wait)
                    .map_err(|_| InvokeError::Cancelled)?;
            }
        }
        Err(InvokeError::Exhausted {
            attempts,
            last_failure,
        })
    }
}
