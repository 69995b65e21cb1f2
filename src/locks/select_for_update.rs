use super::retry::{AttemptOutcome, back_off, lock_failed};
use super::{DEFAULT_ATTEMPTS, Lock};
use crate::backoff::{Sleeper, ThreadSleeper};
use crate::error::FlowLockError;
use crate::process::{FlowType, ProcessKey};
use crate::store::{ProcessStore, TxGuard};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Row lock on the process record (`SELECT ... FOR UPDATE`).
///
/// Every attempt opens a transaction and asks the store for an exclusive
/// lock on the process row. Contention, any other storage error, and a
/// missing row are all retried the same way: a process that should exist
/// but is not visible yet (its creator has not committed) looks exactly
/// like a locked one. After `attempts` failures the acquisition fails with
/// [`FlowLockError::LockFailed`].
///
/// With `nowait` (the default) contention surfaces immediately and the
/// waiting happens in this strategy's backoff; without it the store blocks
/// until the holder finishes.
#[derive(Clone)]
pub struct SelectForUpdateLock {
    nowait: bool,
    attempts: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl SelectForUpdateLock {
    pub fn new(nowait: bool, attempts: u32) -> Self {
        Self {
            nowait,
            attempts,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn nowait(&self) -> bool {
        self.nowait
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for SelectForUpdateLock {
    fn default() -> Self {
        Self::new(true, DEFAULT_ATTEMPTS)
    }
}

impl std::fmt::Debug for SelectForUpdateLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectForUpdateLock")
            .field("nowait", &self.nowait)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl Lock for SelectForUpdateLock {
    fn acquire<S, T, E, F>(
        &self,
        store: &S,
        flow: &FlowType,
        key: &ProcessKey,
        work: F,
    ) -> Result<T, E>
    where
        S: ProcessStore,
        E: From<FlowLockError>,
        F: FnOnce(&mut S::Tx) -> Result<T, E>,
    {
        for attempt in 0..self.attempts {
            let mut guard = TxGuard::begin(store).map_err(FlowLockError::Transaction)?;

            match store.lock_for_update(guard.tx_mut(), flow, key, self.nowait) {
                Ok(()) => {
                    trace!(flow = %flow, key = %key, attempt, outcome = %AttemptOutcome::Acquired, "row lock held");
                    let outcome = work(guard.tx_mut());
                    return guard.finish(outcome);
                }
                Err(e) => {
                    debug!(flow = %flow, key = %key, attempt, error = %e, "row lock not obtained");
                    if let Err(e) = guard.rollback() {
                        warn!(flow = %flow, key = %key, error = %e, "rollback of failed lock attempt did not complete");
                    }
                    back_off(self.sleeper.as_ref(), flow, key, attempt, self.attempts)?;
                }
            }
        }

        Err(lock_failed(flow).into())
    }
}
