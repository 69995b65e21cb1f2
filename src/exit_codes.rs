//! Exit code constants for the flowlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, refused operation)
//! - 3: Backend failure (store, cache, or transaction I/O)
//! - 4: Lock acquisition failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or a refused operation.
pub const USER_ERROR: i32 = 1;

/// Backend failure: the store, the cache, or a transaction boundary failed.
pub const BACKEND_FAILURE: i32 = 3;

/// Lock acquisition failure: the attempt budget was exhausted.
pub const LOCK_FAILURE: i32 = 4;
