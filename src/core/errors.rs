/*!
 * Error Types
 * Centralized error handling with thiserror
 *
 * Three recoverable categories cross the whole crate: protocol violations
 * (a caller broke the checkout/claim discipline), out-of-range arguments
 * (duplicate in-flight index, oversize length), and resource exhaustion at
 * construction. Internal consistency failures are not represented here:
 * those are bugs in the structures themselves and abort via panic.
 */

use crate::core::types::SeqIndex;
use thiserror::Error;

/// Result type for exchange buffer operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Result type for scatter/gather rack operations
pub type RackResult<T> = Result<T, RackError>;

/// Result type for the layered sync primitives
pub type SyncResult<T> = Result<T, SyncError>;

/// Exchange buffer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("length out of range: {requested} exceeds {limit}")]
    LengthOutOfRange { requested: usize, limit: usize },

    #[error("invalid {what}: {requested} not in 1..={max}")]
    InvalidCapacity {
        what: &'static str,
        requested: usize,
        max: usize,
    },

    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),
}

/// Scatter/gather rack errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RackError {
    #[error("sequence index {0} already has a pending entry")]
    DuplicateIndex(SeqIndex),

    #[error("invalid {what}: {requested} not in 1..={max}")]
    InvalidCapacity {
        what: &'static str,
        requested: usize,
        max: usize,
    },

    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),
}

/// Errors from the layered sync primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("protocol violation: {0}")]
    Protocol(String),
}
