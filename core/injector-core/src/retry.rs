//! Bounded polling for side effects of another process.
//!
//! The post-commit hook runs before CodeBlend has written the new commit's
//! cache file, so it polls for it. Sleeping goes through [`Sleeper`] so the
//! schedule can be checked in tests without waiting.

use std::time::Duration;

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of checks, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed check.
    pub initial_delay: Duration,
    /// Factor applied to the wait after every further failure.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Schedule used while waiting for a commit cache file.
    pub const fn post_commit() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            multiplier: 1.5,
        }
    }

    /// Waits between consecutive checks; one fewer than `max_attempts`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let waits = self.max_attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(self.initial_delay), move |d| {
            Some(d.mul_f64(self.multiplier.max(0.0)))
        })
        .take(waits)
    }

    /// Calls `check` until it returns `Some`, at most `max_attempts` times.
    ///
    /// The check receives the 1-based attempt number. There is no wait after
    /// the final attempt.
    pub fn poll<T>(
        &self,
        sleeper: &dyn Sleeper,
        mut check: impl FnMut(u32) -> Option<T>,
    ) -> Option<T> {
        let mut delays = self.delays();
        for attempt in 1..=self.max_attempts {
            if let Some(found) = check(attempt) {
                return Some(found);
            }
            match delays.next() {
                Some(delay) => {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying");
                    sleeper.sleep(delay);
                }
                None => break,
            }
        }
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::post_commit()
    }
}
