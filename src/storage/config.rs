//! Storage configuration.

use std::path::{Path, PathBuf};

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default backing file name.
pub const DEFAULT_DB_FILE: &str = "pagestore.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Backing file for all pages.
    pub path: PathBuf,
    /// Number of frames kept resident.
    pub pool_size: usize,
    /// Start from an empty file instead of reopening existing pages.
    pub truncate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from(DEFAULT_DB_FILE),
            pool_size: DEFAULT_POOL_SIZE,
            truncate: false,
        }
    }
}

impl StorageConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StorageConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.path, PathBuf::from("pagestore.db"));
        assert_eq!(config.pool_size, 64);
        assert!(!config.truncate);
    }

    #[test]
    fn test_builder() {
        let config = StorageConfig::new("/tmp/data.db")
            .with_pool_size(10)
            .with_truncate(true);
        assert_eq!(config.path, PathBuf::from("/tmp/data.db"));
        assert_eq!(config.pool_size, 10);
        assert!(config.truncate);
    }
}
