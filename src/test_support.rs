use crate::backoff::Sleeper;
use crate::process::{FlowType, ProcessKey};
use crate::store::{InMemoryStore, MemoryTx, ProcessStore, StoreError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested sleeps without waiting.
#[derive(Debug, Default)]
pub(crate) struct CountingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl CountingSleeper {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count(&self) -> usize {
        self.slept.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub(crate) fn durations(&self) -> Vec<Duration> {
        self.slept.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(duration);
    }
}

/// Waits a fixed short time regardless of the requested delay.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedSleeper(pub(crate) Duration);

impl Sleeper for FixedSleeper {
    fn sleep(&self, _duration: Duration) {
        std::thread::sleep(self.0);
    }
}

/// In-memory store whose `lock_for_update` / `exists` replay scripted
/// answers before falling through to the real store.
#[derive(Debug, Default)]
pub(crate) struct ScriptedStore {
    pub(crate) inner: InMemoryStore,
    lock_script: Mutex<VecDeque<StoreError>>,
    exists_script: Mutex<VecDeque<bool>>,
    begin_script: Mutex<VecDeque<StoreError>>,
    commit_script: Mutex<VecDeque<StoreError>>,
    lock_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the next `lock_for_update` calls with these errors, in order.
    pub(crate) fn fail_locks(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.lock_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(errors);
    }

    /// Answer the next `exists` calls with these values, in order.
    pub(crate) fn script_exists(&self, answers: impl IntoIterator<Item = bool>) {
        self.exists_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(answers);
    }

    /// Fail the next `begin` calls with these errors, in order.
    pub(crate) fn fail_begins(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.begin_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(errors);
    }

    /// Fail the next `commit` calls with these errors, in order. A failed
    /// commit discards the transaction like a database abort would.
    pub(crate) fn fail_commits(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.commit_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(errors);
    }

    pub(crate) fn lock_calls(&self) -> usize {
        self.lock_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

impl ProcessStore for ScriptedStore {
    type Tx = MemoryTx;

    fn begin(&self) -> Result<MemoryTx, StoreError> {
        let scripted = self
            .begin_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.begin(),
        }
    }

    fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        let scripted = self
            .commit_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match scripted {
            Some(err) => {
                self.inner.rollback(tx)?;
                Err(err)
            }
            None => self.inner.commit(tx),
        }
    }

    fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        self.inner.rollback(tx)
    }

    fn lock_for_update(
        &self,
        tx: &mut MemoryTx,
        flow: &FlowType,
        key: &ProcessKey,
        nowait: bool,
    ) -> Result<(), StoreError> {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .lock_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.lock_for_update(tx, flow, key, nowait),
        }
    }

    fn exists(&self, flow: &FlowType, key: &ProcessKey) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .exists_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match scripted {
            Some(answer) => Ok(answer),
            None => self.inner.exists(flow, key),
        }
    }
}
