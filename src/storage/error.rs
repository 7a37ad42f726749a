//! Storage layer error types.

use crate::storage::page::{PageId, RecordId};
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No room in page: record needs {required} bytes but only {available} available")]
    NoRoom { required: usize, available: usize },

    #[error("Record too large: key {key_len} bytes, value {value_len} bytes")]
    RecordTooLarge { key_len: usize, value_len: usize },

    #[error("Invalid record encoding: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Usable frame not found: every frame is pinned")]
    UsableFrameNotFound,

    #[error("Page not found in buffer pool: {0}")]
    PageNotFound(PageId),

    #[error("Page {page_id} is not allocated (next page id is {next})")]
    PageNotAllocated { page_id: PageId, next: u32 },

    #[error("Page {page_id} is in use (pin count {pin_count})")]
    PageInUse { page_id: PageId, pin_count: u32 },

    #[error("Page {page_id} is corrupted: {reason}")]
    Corrupted { page_id: PageId, reason: String },

    #[error("Buffer size must be PAGE_SIZE ({expected}), got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Disk manager is closed")]
    Closed,

    /// Returned by a `range_records` callback to pass over a record
    /// without stopping the iteration.
    #[error("Record skipped")]
    SkipRecord,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
