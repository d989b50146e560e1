// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration

use crate::exec::memory::MemoryAllocator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tuning knobs for query execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum rows per emitted table
    pub batch_size: usize,

    /// Capacity of each result's table stream
    pub table_buffer: usize,

    /// Capacity of the executor's metadata stream
    pub metadata_buffer: usize,

    /// Per-query memory limit in bytes; unlimited when absent
    pub memory_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            table_buffer: 4,
            metadata_buffer: 16,
            memory_limit: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file. Missing fields take
    /// their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("batch_size", self.batch_size),
            ("table_buffer", self.table_buffer),
            ("metadata_buffer", self.metadata_buffer),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
            }
        }
        if self.memory_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "memory_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// A fresh allocator honoring the configured memory limit
    pub fn allocator(&self) -> MemoryAllocator {
        match self.memory_limit {
            Some(limit) => MemoryAllocator::new(limit),
            None => MemoryAllocator::unlimited(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 2, "memory_limit": 4096}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.memory_limit, Some(4096));
        assert_eq!(config.metadata_buffer, EngineConfig::default().metadata_buffer);
        assert_eq!(config.allocator().limit(), 4096);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = EngineConfig {
            batch_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"table_buffer": 0}}"#).unwrap();
        assert!(EngineConfig::from_file(file.path()).is_err());
    }
}
