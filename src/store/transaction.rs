//! Scoped transactions.
//!
//! [`TxGuard`] owns an open transaction and rolls it back when dropped
//! unless it was committed, so a panic inside protected work cannot leave
//! row locks behind. [`atomic`] is the callback form used by the strategies.

use super::{ProcessStore, StoreError};
use crate::error::FlowLockError;
use tracing::warn;

/// RAII guard for an open transaction.
///
/// When dropped without [`commit`](TxGuard::commit) or
/// [`rollback`](TxGuard::rollback), the transaction is rolled back. If
/// that rollback fails, a warning is logged but no panic occurs.
pub struct TxGuard<'s, S: ProcessStore> {
    store: &'s S,
    tx: Option<S::Tx>,
}

impl<'s, S: ProcessStore> TxGuard<'s, S> {
    /// Begin a transaction on `store`.
    pub fn begin(store: &'s S) -> Result<Self, StoreError> {
        let tx = store.begin()?;
        Ok(Self {
            store,
            tx: Some(tx),
        })
    }

    /// Mutable access to the open transaction handle.
    pub fn tx_mut(&mut self) -> &mut S::Tx {
        self.tx
            .as_mut()
            .expect("transaction handle is present until the guard is consumed")
    }

    /// Commit the transaction.
    pub fn commit(mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => self.store.commit(tx),
            None => Ok(()),
        }
    }

    /// Roll the transaction back explicitly.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => self.store.rollback(tx),
            None => Ok(()),
        }
    }

    /// Commit if `outcome` is `Ok`, roll back if it is `Err`.
    ///
    /// The work's error is returned unchanged; a failed rollback is only
    /// logged. A failed commit becomes [`FlowLockError::Transaction`].
    pub fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<FlowLockError>,
    {
        match outcome {
            Ok(value) => {
                self.commit().map_err(FlowLockError::Transaction)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = self.rollback() {
                    warn!(error = %e, "rollback after failed work did not complete");
                }
                Err(err)
            }
        }
    }
}

impl<S: ProcessStore> Drop for TxGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take()
            && let Err(e) = self.store.rollback(tx)
        {
            warn!(error = %e, "failed to roll back abandoned transaction");
        }
    }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err` (the
/// error is returned unchanged) or panics. Failing to open or commit the
/// transaction is reported as [`FlowLockError::Transaction`].
pub fn atomic<S, T, E, F>(store: &S, work: F) -> Result<T, E>
where
    S: ProcessStore,
    E: From<FlowLockError>,
    F: FnOnce(&mut S::Tx) -> Result<T, E>,
{
    let mut guard = TxGuard::begin(store).map_err(FlowLockError::Transaction)?;
    let outcome = work(guard.tx_mut());
    guard.finish(outcome)
}
