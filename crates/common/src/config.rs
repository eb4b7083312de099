use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// World streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of one block, in pixels.
    pub block_size: i32,
    /// Edge length of one chunk, in blocks.
    pub chunk_span: i32,
    /// Time between garbage-collect sweeps of each part cache.
    pub gc_interval_ms: u64,
    /// Background threads used for part load and save.
    pub io_workers: usize,
    /// Preload radius (in chunks) for observers that do not set their own.
    pub default_preload_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            block_size: 32,
            chunk_span: 32,
            gc_interval_ms: 10_000,
            io_workers: 2,
            default_preload_radius: 1,
        }
    }
}

impl WorldConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: WorldConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size <= 0 {
            return Err(ConfigError::Invalid("block_size must be positive"));
        }
        if self.chunk_span <= 0 {
            return Err(ConfigError::Invalid("chunk_span must be positive"));
        }
        if self.io_workers == 0 {
            return Err(ConfigError::Invalid("io_workers must be at least 1"));
        }
        if self.default_preload_radius < 0 {
            return Err(ConfigError::Invalid(
                "default_preload_radius must not be negative",
            ));
        }
        Ok(())
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    pub fn metrics(&self) -> GridMetrics {
        GridMetrics {
            block_size: self.block_size,
            chunk_span: self.chunk_span,
        }
    }
}

/// Block and chunk dimensions every coordinate conversion needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMetrics {
    pub block_size: i32,
    pub chunk_span: i32,
}

impl GridMetrics {
    pub fn chunk_pixel_size(&self) -> i32 {
        self.block_size * self.chunk_span
    }
}

impl Default for GridMetrics {
    fn default() -> Self {
        WorldConfig::default().metrics()
    }
}
