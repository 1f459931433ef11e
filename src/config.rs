use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Sizing of the background read and write buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StreamConfig {
    /// Size in bytes of a single block handed between threads.
    pub block_size: usize,
    /// Total number of bytes buffered, at least two blocks.
    pub capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_size: 64 * 1024,
            capacity: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Capacity of the row to token row cache of a loaded index.
    pub token_row_cache: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            token_row_cache: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrieConfig {
    /// Subtrees with at most this many distinct descriptors are collapsed.
    pub prune_bound: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self { prune_bound: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Tokens with more characters than this are not indexed.
    pub max_token_chars: usize,
    /// Gzip level of html bodies, 0 to 9.
    pub compression_level: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_token_chars: 64,
            compression_level: 6,
        }
    }
}

/// A configuration used for the application.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub stream: StreamConfig,
    pub index: IndexConfig,
    pub trie: TrieConfig,
    pub build: BuildConfig,
}

impl Config {
    /// Load configuration from the given path, falling back to defaults if
    /// no path is given or the file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| anyhow::anyhow!("{}", path.display()))?;

        let config = Self::parse(&data).with_context(|| anyhow::anyhow!("{}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(data: &str) -> Result<Self> {
        let config: Self = toml::from_str(data)?;

        if config.build.compression_level > crate::container::COMPRESSION_MAX {
            bail!(
                "build.compression-level must be between 0 and {}, got {}",
                crate::container::COMPRESSION_MAX,
                config.build.compression_level
            );
        }

        Ok(config)
    }
}
