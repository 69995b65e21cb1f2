//! Error types for flowlock.
//!
//! Uses thiserror for derive macros. Protected work keeps its own error
//! type; it only needs `From<FlowLockError>` so lock failures can flow
//! through the same `Result`.

use crate::exit_codes;
use crate::store::StoreError;
use thiserror::Error;

/// Main error type for lock operations.
#[derive(Error, Debug)]
pub enum FlowLockError {
    /// The attempt budget was exhausted without acquiring the lock.
    #[error("Lock failed for {flow}")]
    LockFailed {
        /// Label of the flow type whose process could not be locked.
        flow: String,
    },

    /// A store operation outside a transaction boundary failed.
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// Opening, committing or rolling back a transaction failed.
    #[error("Transaction failed: {0}")]
    Transaction(StoreError),

    /// The cache backend failed (I/O, serialization, poisoned state).
    #[error("Cache operation failed: {0}")]
    Cache(String),

    /// Configuration could not be read or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// User provided invalid arguments or asked for a refused operation.
    #[error("{0}")]
    UserError(String),
}

impl FlowLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlowLockError::LockFailed { .. } => exit_codes::LOCK_FAILURE,
            FlowLockError::Store(_) | FlowLockError::Transaction(_) | FlowLockError::Cache(_) => {
                exit_codes::BACKEND_FAILURE
            }
            FlowLockError::Config(_) | FlowLockError::UserError(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether this error is the terminal "attempts exhausted" failure.
    pub fn is_lock_failed(&self) -> bool {
        matches!(self, FlowLockError::LockFailed { .. })
    }
}

/// Result type alias for flowlock operations.
pub type Result<T> = std::result::Result<T, FlowLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_failed_has_lock_exit_code() {
        let err = FlowLockError::LockFailed {
            flow: "helpdesk".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert!(err.is_lock_failed());
    }

    #[test]
    fn backend_errors_share_exit_code() {
        let store = FlowLockError::Store(StoreError::Backend("disk full".to_string()));
        let tx = FlowLockError::Transaction(StoreError::Backend("commit".to_string()));
        let cache = FlowLockError::Cache("connection reset".to_string());
        assert_eq!(store.exit_code(), exit_codes::BACKEND_FAILURE);
        assert_eq!(tx.exit_code(), exit_codes::BACKEND_FAILURE);
        assert_eq!(cache.exit_code(), exit_codes::BACKEND_FAILURE);
    }

    #[test]
    fn config_error_is_user_error() {
        let err = FlowLockError::Config("attempts must be greater than 0".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(!err.is_lock_failed());
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = FlowLockError::LockFailed {
            flow: "shipment".to_string(),
        };
        assert_eq!(err.to_string(), "Lock failed for shipment");

        let err = FlowLockError::Store(StoreError::NotFound("shipment/7".to_string()));
        assert_eq!(
            err.to_string(),
            "Store operation failed: process shipment/7 does not exist"
        );
    }
}
