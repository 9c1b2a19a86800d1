//! Configuration for fieldstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for a fieldstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for disk-backed tables
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {table uuid}/
    ///           └── table.log   (operation log)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Operation Log Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync table logs
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Blob Configuration
    // -------------------------------------------------------------------------
    /// Capacity of one blob volume (in bytes)
    pub volume_size: usize,

    /// Size of the chunk read from an input stream per step (in bytes)
    pub stream_buffer_size: usize,

    /// zstd level used when a blob is written with the compressed encoding
    pub compression_level: i32,
}

/// Operation log sync strategy
#[derive(Debug, Clone, Copy)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./fieldstore_data"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            volume_size: 1024 * 1024,       // 1 MB
            stream_buffer_size: 50 * 1024, // 50 KB
            compression_level: 3,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the blob sizing constraints
    pub fn validate(&self) -> Result<()> {
        if self.stream_buffer_size == 0 {
            return Err(StoreError::Config(
                "stream_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.volume_size < self.stream_buffer_size {
            return Err(StoreError::Config(format!(
                "volume_size ({}) must be at least stream_buffer_size ({})",
                self.volume_size, self.stream_buffer_size
            )));
        }
        // Block lengths are stored in 4 bytes
        if self.volume_size as u64 > u32::MAX as u64 {
            return Err(StoreError::Config(format!(
                "volume_size ({}) exceeds the addressable range",
                self.volume_size
            )));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(StoreError::Config(
                "EveryNEntries count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all disk-backed tables)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the blob volume capacity (in bytes)
    pub fn volume_size(mut self, size: usize) -> Self {
        self.config.volume_size = size;
        self
    }

    /// Set the blob stream read chunk (in bytes)
    pub fn stream_buffer_size(mut self, size: usize) -> Self {
        self.config.stream_buffer_size = size;
        self
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
