//! In-process process store with row-level exclusive locks.
//!
//! Rows are keyed by `(flow label, process key)` and hold a JSON value.
//! A transaction takes row locks through `lock_for_update`, stages writes
//! with [`InMemoryStore::put`], and applies them on commit. Blocking lock
//! requests wait on a `Condvar` that is signalled whenever a transaction
//! finishes.

use super::{ProcessStore, StoreError};
use crate::process::{FlowType, ProcessKey};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

type RowId = (String, ProcessKey);

fn row_id(flow: &FlowType, key: &ProcessKey) -> RowId {
    (flow.label().to_string(), key.clone())
}

fn describe(id: &RowId) -> String {
    format!("{}/{}", id.0, id.1)
}

#[derive(Debug)]
struct Row {
    data: Value,
    locked_by: Option<u64>,
}

/// Open transaction on an [`InMemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    id: u64,
    locked: Vec<RowId>,
    writes: HashMap<RowId, Value>,
}

impl MemoryTx {
    /// Identifier of this transaction.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// In-memory [`ProcessStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: Mutex<HashMap<RowId, Row>>,
    released: Condvar,
    next_tx: AtomicU64,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<RowId, Row>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Backend("process store mutex poisoned".to_string()))
    }

    /// Insert or replace a process row outside any transaction.
    ///
    /// An existing row keeps its lock holder.
    pub fn insert(
        &self,
        flow: &FlowType,
        key: impl Into<ProcessKey>,
        data: Value,
    ) -> Result<(), StoreError> {
        let id = row_id(flow, &key.into());
        let mut rows = self.rows()?;
        match rows.get_mut(&id) {
            Some(row) => row.data = data,
            None => {
                rows.insert(
                    id,
                    Row {
                        data,
                        locked_by: None,
                    },
                );
            }
        }
        Ok(())
    }

    /// Delete a process row outside any transaction.
    pub fn remove(&self, flow: &FlowType, key: &ProcessKey) -> Result<Option<Value>, StoreError> {
        let removed = self.rows()?.remove(&row_id(flow, key));
        self.released.notify_all();
        Ok(removed.map(|row| row.data))
    }

    /// Committed value of a process row.
    pub fn load(&self, flow: &FlowType, key: &ProcessKey) -> Result<Option<Value>, StoreError> {
        Ok(self
            .rows()?
            .get(&row_id(flow, key))
            .map(|row| row.data.clone()))
    }

    /// Read a process row as seen by `tx` (its own staged writes first).
    pub fn get(
        &self,
        tx: &MemoryTx,
        flow: &FlowType,
        key: &ProcessKey,
    ) -> Result<Value, StoreError> {
        let id = row_id(flow, key);
        if let Some(staged) = tx.writes.get(&id) {
            return Ok(staged.clone());
        }
        self.rows()?
            .get(&id)
            .map(|row| row.data.clone())
            .ok_or_else(|| StoreError::NotFound(describe(&id)))
    }

    /// Stage a write to a process row; applied when `tx` commits.
    pub fn put(
        &self,
        tx: &mut MemoryTx,
        flow: &FlowType,
        key: &ProcessKey,
        data: Value,
    ) -> Result<(), StoreError> {
        let id = row_id(flow, key);
        if !self.rows()?.contains_key(&id) {
            return Err(StoreError::NotFound(describe(&id)));
        }
        tx.writes.insert(id, data);
        Ok(())
    }

    /// Whether any transaction currently holds the row lock.
    pub fn is_locked(&self, flow: &FlowType, key: &ProcessKey) -> Result<bool, StoreError> {
        Ok(self
            .rows()?
            .get(&row_id(flow, key))
            .is_some_and(|row| row.locked_by.is_some()))
    }

    /// Number of committed transactions.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of rolled back transactions.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn release(&self, rows: &mut HashMap<RowId, Row>, tx: &MemoryTx) {
        for id in &tx.locked {
            if let Some(row) = rows.get_mut(id)
                && row.locked_by == Some(tx.id)
            {
                row.locked_by = None;
            }
        }
        self.released.notify_all();
    }
}

impl ProcessStore for InMemoryStore {
    type Tx = MemoryTx;

    fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            id: self.next_tx.fetch_add(1, Ordering::SeqCst) + 1,
            locked: Vec::new(),
            writes: HashMap::new(),
        })
    }

    fn commit(&self, mut tx: MemoryTx) -> Result<(), StoreError> {
        let mut rows = self.rows()?;
        for (id, data) in tx.writes.drain() {
            // Rows deleted while the transaction was open stay deleted.
            if let Some(row) = rows.get_mut(&id) {
                row.data = data;
            }
        }
        self.release(&mut rows, &tx);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        let mut rows = self.rows()?;
        self.release(&mut rows, &tx);
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn lock_for_update(
        &self,
        tx: &mut MemoryTx,
        flow: &FlowType,
        key: &ProcessKey,
        nowait: bool,
    ) -> Result<(), StoreError> {
        let id = row_id(flow, key);
        let mut rows = self.rows()?;
        loop {
            let holder = match rows.get(&id) {
                Some(row) => row.locked_by,
                None => return Err(StoreError::NotFound(describe(&id))),
            };
            match holder {
                None => {
                    if let Some(row) = rows.get_mut(&id) {
                        row.locked_by = Some(tx.id);
                    }
                    tx.locked.push(id);
                    return Ok(());
                }
                Some(owner) if owner == tx.id => return Ok(()),
                Some(_) if nowait => return Err(StoreError::Contention(describe(&id))),
                Some(_) => {
                    rows = self.released.wait(rows).map_err(|_| {
                        StoreError::Backend("process store mutex poisoned".to_string())
                    })?;
                }
            }
        }
    }

    fn exists(&self, flow: &FlowType, key: &ProcessKey) -> Result<bool, StoreError> {
        Ok(self.rows()?.contains_key(&row_id(flow, key)))
    }
}
