//! Jittered exponential backoff between lock attempts.
//!
//! `delay(i) = ((i + 1) * U(0, 1) + 2^i) / 2.5` seconds. The exponential
//! term spreads retries out, the jitter term keeps competing workers from
//! retrying in lockstep.

use std::time::Duration;

/// Largest exponent honoured before the delay saturates.
const MAX_EXPONENT: u32 = 48;

/// Delay to wait after the failed attempt with the given zero-based index.
pub fn delay(attempt: u32) -> Duration {
    delay_with_jitter(attempt, rand::random::<f64>())
}

/// Deterministic form of [`delay`] for a given jitter sample in `[0, 1]`.
pub fn delay_with_jitter(attempt: u32, jitter: f64) -> Duration {
    let jitter = if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let exponent = attempt.min(MAX_EXPONENT);
    let seconds = ((f64::from(attempt) + 1.0) * jitter + 2f64.powi(exponent as i32)) / 2.5;
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Something that can wait for a backoff delay.
///
/// Strategies sleep through this trait so callers can plug in their own
/// clock (tests count the calls instead of waiting).
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
