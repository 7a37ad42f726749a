//! Storage layer implementation for pagestore.
//!
//! This module provides page-based persistent storage. Key components:
//!
//! - **Page**: Fixed-size (16KB) slotted pages holding key-ordered records
//! - **DiskManager**: Maps page ids to fixed offsets in a backing file
//! - **BufferPoolManager**: In-memory cache of pages with CLOCK eviction
//!
//! Callers pin pages through the buffer pool, mutate them in place through
//! a `PageHandle`, and unpin them (optionally marking them dirty) when done.

pub mod buffer;
pub mod config;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPoolManager, BufferPoolStats, PageHandle};
pub use config::StorageConfig;
pub use disk::{DiskManager, FileDiskManager, MemoryDiskManager};
pub use error::{StorageError, StorageResult};
pub use page::{Page, PageId, Record, RecordId, PAGE_SIZE};
