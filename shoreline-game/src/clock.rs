//! Cooperative cancellation and the sleeping seam used by retries and pacing.
use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Longest uninterrupted sleep before the cancel flag is re-checked.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Returned when a wait was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared flag raised by an external interrupt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Blocking waits used by the invoker backoff and end-of-tick pacing.
pub trait Clock {
    /// Wait for `duration`, returning early if cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when the wait was interrupted.
    fn sleep(&self, duration: Duration) -> Result<(), Cancelled>;

    /// Whether the current game should stop at the next step boundary.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Real clock sleeping the current thread in short slices.
#[derive(Debug, Clone, Default)]
pub struct ThreadClock {
    token: CancelToken,
}

impl ThreadClock {
    #[must_use]
    pub const fn new(token: CancelToken) -> Self {
        Self { token }
    }

    #[must_use]
    pub const fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Clock for ThreadClock {
    fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            self.token.check()?;
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        self.token.check()
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Clock that never blocks and remembers every requested wait.
///
/// Used by tests and offline dry runs.
#[derive(Debug, Default)]
pub struct RecordingClock {
    token: CancelToken,
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: CancelToken) -> Self {
        Self {
            token,
            sleeps: RefCell::default(),
        }
    }

    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    #[must_use]
    pub fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.token.check()?;
        self.sleeps.borrow_mut().push(duration);
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
