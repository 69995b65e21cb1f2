//! Shared retry step for the retrying strategies.

use crate::backoff::{self, Sleeper};
use crate::error::FlowLockError;
use crate::process::{FlowType, ProcessKey};
use std::fmt;
use tracing::{debug, warn};

/// Outcome of one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The lock was obtained.
    Acquired,
    /// Someone else holds the lock (or the record is not visible yet).
    Contended,
    /// The last permitted attempt failed.
    Exhausted,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Acquired => write!(f, "acquired"),
            AttemptOutcome::Contended => write!(f, "contended"),
            AttemptOutcome::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Wait before the next attempt, or fail if `attempt` was the last one.
///
/// Never sleeps after the final attempt.
pub(super) fn back_off(
    sleeper: &dyn Sleeper,
    flow: &FlowType,
    key: &ProcessKey,
    attempt: u32,
    attempts: u32,
) -> Result<(), FlowLockError> {
    if attempt.saturating_add(1) >= attempts {
        warn!(
            flow = %flow,
            key = %key,
            attempts,
            outcome = %AttemptOutcome::Exhausted,
            "giving up on process lock"
        );
        return Err(lock_failed(flow));
    }

    let pause = backoff::delay(attempt);
    debug!(
        flow = %flow,
        key = %key,
        attempt,
        outcome = %AttemptOutcome::Contended,
        delay_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
        "process lock busy, backing off"
    );
    sleeper.sleep(pause);
    Ok(())
}

pub(super) fn lock_failed(flow: &FlowType) -> FlowLockError {
    FlowLockError::LockFailed {
        flow: flow.label().to_string(),
    }
}
