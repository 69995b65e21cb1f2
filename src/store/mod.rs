//! Durable process storage and transaction boundaries.
//!
//! The lock strategies never talk to a database directly. They go through
//! [`ProcessStore`], which bundles the two collaborators they need:
//!
//! - a transactional scope (`begin` / `commit` / `rollback`), and
//! - record access (`lock_for_update`, `exists`).
//!
//! [`transaction`] provides the scoped helpers built on top of it, and
//! [`memory`] an in-process implementation with real row locks.

pub mod memory;
pub mod transaction;

use crate::process::{FlowType, ProcessKey};
use std::sync::Arc;
use thiserror::Error;

pub use memory::{InMemoryStore, MemoryTx};
pub use transaction::{TxGuard, atomic};

/// Errors raised by a [`ProcessStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The row is exclusively locked by another transaction.
    #[error("process {0} is locked by another transaction")]
    Contention(String),

    /// No row matches the process key (or it is not visible yet).
    #[error("process {0} does not exist")]
    NotFound(String),

    /// Any other storage failure.
    #[error("{0}")]
    Backend(String),
}

/// Storage engine holding process rows.
pub trait ProcessStore: Send + Sync {
    /// Open transaction handle.
    type Tx;

    /// Start a transaction.
    fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Make the transaction's writes durable and release its row locks.
    ///
    /// The transaction ends even when this fails: its writes are discarded
    /// and its row locks released.
    fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Discard the transaction's writes and release its row locks.
    fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Place an exclusive lock on the process row within `tx`.
    ///
    /// With `nowait` a conflicting lock surfaces immediately as
    /// [`StoreError::Contention`]; otherwise the call blocks until the
    /// holder finishes. A missing row yields [`StoreError::NotFound`].
    fn lock_for_update(
        &self,
        tx: &mut Self::Tx,
        flow: &FlowType,
        key: &ProcessKey,
        nowait: bool,
    ) -> Result<(), StoreError>;

    /// Whether a row for the process currently exists. Takes no lock.
    fn exists(&self, flow: &FlowType, key: &ProcessKey) -> Result<bool, StoreError>;
}

impl<S: ProcessStore> ProcessStore for Arc<S> {
    type Tx = S::Tx;

    fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin()
    }

    fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        (**self).commit(tx)
    }

    fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        (**self).rollback(tx)
    }

    fn lock_for_update(
        &self,
        tx: &mut Self::Tx,
        flow: &FlowType,
        key: &ProcessKey,
        nowait: bool,
    ) -> Result<(), StoreError> {
        (**self).lock_for_update(tx, flow, key, nowait)
    }

    fn exists(&self, flow: &FlowType, key: &ProcessKey) -> Result<bool, StoreError> {
        (**self).exists(flow, key)
    }
}
