use super::Lock;
use crate::error::FlowLockError;
use crate::process::{FlowType, ProcessKey};
use crate::store::{ProcessStore, atomic};

/// No pessimistic locking: the work just runs in a transaction.
///
/// Two workers advancing the same process run concurrently. Only use it
/// for flows without join points; a join merging concurrent branches
/// races silently under this strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl NoLock {
    pub fn new() -> Self {
        Self
    }
}

impl Lock for NoLock {
    fn acquire<S, T, E, F>(
        &self,
        store: &S,
        _flow: &FlowType,
        _key: &ProcessKey,
        work: F,
    ) -> Result<T, E>
    where
        S: ProcessStore,
        E: From<FlowLockError>,
        F: FnOnce(&mut S::Tx) -> Result<T, E>,
    {
        atomic(store, work)
    }
}
