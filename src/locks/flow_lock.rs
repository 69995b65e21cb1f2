use super::{Lock, LockStrategy};
use crate::error::FlowLockError;
use crate::process::{FlowType, ProcessKey};
use crate::store::ProcessStore;

/// A lock strategy bound to a flow type and its process store.
///
/// Built once at configuration time; the engine then calls
/// [`acquire`](FlowLock::acquire) for every task it executes.
///
/// ```no_run
/// use flowlock::{FlowLock, FlowLockError, FlowType, InMemoryStore, ProcessKey, SelectForUpdateLock};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// let flow = FlowType::new("helpdesk");
/// store.insert(&flow, 1, json!({"status": "open"}))?;
///
/// let lock = FlowLock::new(flow, store, SelectForUpdateLock::default());
/// lock.acquire(1, |tx| {
///     let (flow, store) = (lock.flow(), lock.store());
///     store.put(tx, flow, &ProcessKey::Int(1), json!({"status": "closed"}))?;
///     Ok::<_, FlowLockError>(())
/// })?;
/// # Ok::<(), FlowLockError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FlowLock<S, L = LockStrategy> {
    flow: FlowType,
    store: S,
    lock: L,
}

impl<S, L> FlowLock<S, L>
where
    S: ProcessStore,
    L: Lock,
{
    pub fn new(flow: FlowType, store: S, lock: L) -> Self {
        Self { flow, store, lock }
    }

    /// Run `work` on the process `key` under the bound strategy.
    pub fn acquire<T, E, F>(&self, key: impl Into<ProcessKey>, work: F) -> Result<T, E>
    where
        E: From<FlowLockError>,
        F: FnOnce(&mut S::Tx) -> Result<T, E>,
    {
        let key = key.into();
        self.lock.acquire(&self.store, &self.flow, &key, work)
    }

    pub fn flow(&self) -> &FlowType {
        &self.flow
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }
}
