//! Encoder Configuration
//!
//! This module provides the tunable parameters of the aws-chunked encoder.
//!
//! # Features
//! - `serde` support for serialization/deserialization
//! - Default values for all parameters
//! - Static configuration via [`StaticConfigProvider`]
//! - Hot-reload configuration via [`HotReloadConfigProvider`]
//!
//! An encoder takes a single snapshot when it is built.
//! Updating a provider never changes the framing of a stream that is already running.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use s3s_chunked::config::{ChunkedConfig, ChunkedConfigProvider, HotReloadConfigProvider};
//!
//! let provider = HotReloadConfigProvider::default();
//! assert_eq!(provider.snapshot().chunk_size, 64 * 1024);
//!
//! let mut config = ChunkedConfig::default();
//! config.chunk_size = 8 * 1024;
//! provider.update(Arc::new(config));
//! assert_eq!(provider.snapshot().chunk_size, 8 * 1024);
//! ```

use crate::error::ConfigError;

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Default size of one aws-chunked data chunk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default minimum body size for aws-chunked encoding (16 chunks, 1 MiB)
pub const DEFAULT_AWS_CHUNKED_THRESHOLD: u64 = 16 * DEFAULT_CHUNK_SIZE as u64;

/// Configuration provider trait.
///
/// Built-in providers:
/// - [`StaticConfigProvider`] - Immutable configuration
/// - [`HotReloadConfigProvider`] - Runtime-updatable configuration
pub trait ChunkedConfigProvider: Send + Sync + 'static {
    /// Returns a snapshot of the current configuration.
    fn snapshot(&self) -> Arc<ChunkedConfig>;
}

/// aws-chunked encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ChunkedConfig {
    /// Size of every data chunk except the last one, in bytes.
    ///
    /// Default: 64 KiB (65536)
    pub chunk_size: usize,

    /// Minimum body size that makes a seekable body eligible for aws-chunked encoding.
    ///
    /// One-shot bodies are always eligible.
    ///
    /// Default: 1 MiB (16 * 65536)
    pub aws_chunked_threshold: u64,
}

impl Default for ChunkedConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            aws_chunked_threshold: DEFAULT_AWS_CHUNKED_THRESHOLD,
        }
    }
}

impl ChunkedConfig {
    /// Checks that the configuration can drive an encoder.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the chunk size is zero or the threshold is smaller than one chunk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.aws_chunked_threshold < self.chunk_size as u64 {
            return Err(ConfigError::ThresholdTooSmall {
                threshold: self.aws_chunked_threshold,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }
}

/// Static configuration provider.
#[derive(Debug)]
pub struct StaticConfigProvider {
    inner: Arc<ChunkedConfig>,
}

impl StaticConfigProvider {
    #[must_use]
    pub fn new(config: Arc<ChunkedConfig>) -> Self {
        Self { inner: config }
    }
}

impl Default for StaticConfigProvider {
    fn default() -> Self {
        Self::new(Arc::new(ChunkedConfig::default()))
    }
}

impl ChunkedConfigProvider for StaticConfigProvider {
    fn snapshot(&self) -> Arc<ChunkedConfig> {
        Arc::clone(&self.inner)
    }
}

/// Hot-reload configuration provider.
///
/// Lock-free reads and atomic updates through `ArcSwap`.
#[derive(Debug)]
pub struct HotReloadConfigProvider {
    inner: ArcSwap<ChunkedConfig>,
}

impl HotReloadConfigProvider {
    #[must_use]
    pub fn new(config: Arc<ChunkedConfig>) -> Self {
        Self {
            inner: ArcSwap::from(config),
        }
    }

    /// Replaces the entire configuration atomically.
    pub fn update(&self, config: Arc<ChunkedConfig>) {
        self.inner.store(config);
    }
}

impl Default for HotReloadConfigProvider {
    fn default() -> Self {
        Self::new(Arc::new(ChunkedConfig::default()))
    }
}

impl ChunkedConfigProvider for HotReloadConfigProvider {
    fn snapshot(&self) -> Arc<ChunkedConfig> {
        self.inner.load_full()
    }
}
