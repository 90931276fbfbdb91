//! Time abstraction traits for platform-agnostic timing.
//!
//! The sequencer only ever measures elapsed time and asks its caller to
//! suspend. [`TimeSource`] provides the former, [`Delay`] the latter. Both are
//! implemented for `std` types behind the `std` feature.

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Zero duration constant.
    const ZERO: Self;

    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;

    /// Creates duration from milliseconds.
    fn from_millis(millis: u64) -> Self;

    /// Saturating subtraction (returns ZERO on underflow).
    fn saturating_sub(self, other: Self) -> Self;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;

    /// Adds duration to instant, returns None on overflow.
    fn checked_add(self, duration: Self::Duration) -> Option<Self>;
}

/// Why a suspension ended before its full duration elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupted {
    /// The run was cancelled by its owner.
    Cancelled,
    /// The run exceeded its deadline.
    TimedOut,
}

impl core::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Interrupted::Cancelled => write!(f, "run cancelled"),
            Interrupted::TimedOut => write!(f, "run deadline exceeded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Interrupted {}

/// Blocking suspension used by [`Sequencer::run`](crate::Sequencer::run).
///
/// Every suspension point of a run goes through this trait, which makes it the
/// place to observe cancellation or a deadline.
pub trait Delay<D: TimeDuration> {
    /// Blocks for `duration`, or returns early with the reason it was interrupted.
    fn delay(&mut self, duration: D) -> Result<(), Interrupted>;
}

impl TimeDuration for core::time::Duration {
    const ZERO: Self = core::time::Duration::ZERO;

    fn as_millis(&self) -> u64 {
        u64::try_from(core::time::Duration::as_millis(self)).unwrap_or(u64::MAX)
    }

    fn from_millis(millis: u64) -> Self {
        core::time::Duration::from_millis(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        core::time::Duration::saturating_sub(self, other)
    }
}

#[cfg(feature = "std")]
pub use self::host::{CancelToken, StdTimeSource, ThreadDelay};

#[cfg(feature = "std")]
mod host {
    use super::{Delay, Interrupted, TimeInstant, TimeSource};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    /// Longest single sleep between cancellation checks.
    const POLL_SLICE: Duration = Duration::from_millis(20);

    impl TimeInstant for Instant {
        type Duration = Duration;

        fn duration_since(&self, earlier: Self) -> Duration {
            Instant::saturating_duration_since(self, earlier)
        }

        fn checked_add(self, duration: Duration) -> Option<Self> {
            Instant::checked_add(&self, duration)
        }
    }

    /// Monotonic wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StdTimeSource;

    impl TimeSource<Instant> for StdTimeSource {
        fn now(&self) -> Instant {
            Instant::now()
        }
    }

    /// Shared flag used to cancel an in-flight run from another thread.
    #[derive(Debug, Clone, Default)]
    pub struct CancelToken(Arc<AtomicBool>);

    impl CancelToken {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancel(&self) {
            self.0.store(true, Ordering::Release);
        }

        pub fn is_cancelled(&self) -> bool {
            self.0.load(Ordering::Acquire)
        }
    }

    /// [`Delay`] backed by `std::thread::sleep`.
    ///
    /// Sleeps in short slices so a [`CancelToken`] or a deadline is noticed
    /// within [`POLL_SLICE`] of being hit.
    #[derive(Debug, Clone, Default)]
    pub struct ThreadDelay {
        token: CancelToken,
        deadline: Option<Instant>,
    }

    impl ThreadDelay {
        pub fn new() -> Self {
            Self::default()
        }

        /// Interrupts the run once `token` is cancelled.
        pub fn with_token(mut self, token: CancelToken) -> Self {
            self.token = token;
            self
        }

        /// Interrupts the run once `timeout` has passed from now.
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.deadline = Instant::now().checked_add(timeout);
            self
        }

        pub fn token(&self) -> &CancelToken {
            &self.token
        }

        fn check(&self) -> Result<(), Interrupted> {
            if self.token.is_cancelled() {
                return Err(Interrupted::Cancelled);
            }
            match self.deadline {
                Some(deadline) if Instant::now() >= deadline => Err(Interrupted::TimedOut),
                _ => Ok(()),
            }
        }
    }

    impl Delay<Duration> for ThreadDelay {
        fn delay(&mut self, duration: Duration) -> Result<(), Interrupted> {
            let until = Instant::now() + duration;
            loop {
                self.check()?;
                let now = Instant::now();
                if now >= until {
                    return Ok(());
                }
                std::thread::sleep((until - now).min(POLL_SLICE));
            }
        }
    }
}
