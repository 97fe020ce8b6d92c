use std::{
    fmt::Display,
    sync::atomic::AtomicBool,
    time::{Duration, Instant},
};

use tethersend_core::{camera::CameraError, client::FtpClientError};
use thiserror::Error;

use crate::util::sleep_unless_stopped;

/// Errors which deserve a new attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for CameraError {
    fn is_transient(&self) -> bool {
        CameraError::is_transient(self)
    }
}

impl Transient for FtpClientError {
    fn is_transient(&self) -> bool {
        FtpClientError::is_transient(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum wall clock time spent retrying.
    pub budget: Duration,
    /// Pause between two attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(budget: Duration, interval: Duration) -> Self {
        Self { budget, interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(15 * 60), Duration::from_secs(2))
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("{label} still unavailable after {elapsed:?}, give up (last error: {last_error})")]
    BudgetExceeded {
        label: String,
        elapsed: Duration,
        last_error: E,
    },
    #[error("Interrupted while connecting {0}")]
    Interrupted(String),
    #[error("{0}")]
    Fatal(E),
}

/// Call `operation` until it succeeds, a non transient error happens, the
/// policy budget is consumed or the stop signal is raised.
pub fn retry<T, E, F>(
    label: &str,
    policy: &RetryPolicy,
    stop_signal: &AtomicBool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: Transient + Display,
    F: FnMut() -> Result<T, E>,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if stop_signal.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(RetryError::Interrupted(label.to_string()));
        }

        attempt += 1;
        let error = match operation() {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} available after {} attempts", label, attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            log::error!("{} failed with non recoverable error: {}", label, error);
            return Err(RetryError::Fatal(error));
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.budget {
            log::warn!(
                "{} still unavailable after {:?} ({} attempts), give up",
                label,
                elapsed,
                attempt
            );
            return Err(RetryError::BudgetExceeded {
                label: label.to_string(),
                elapsed,
                last_error: error,
            });
        }

        let pause = policy.interval.min(policy.budget - elapsed);
        log::info!("{} unavailable, retry in {:?}", label, pause);
        log::debug!("Error was : {}", error);
        if !sleep_unless_stopped(pause, stop_signal) {
            return Err(RetryError::Interrupted(label.to_string()));
        }
    }
}
