// Copyright 2026 channel-recorder contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Record log factory for creating backends from configuration

use super::backend::RecordLog;
use super::filesystem::FileRecordLog;
use super::memory::MemoryLog;
use crate::config::StorageConfig;
use anyhow::{bail, Result};

pub struct LogFactory;

impl LogFactory {
    /// Create an unopened record log from configuration.
    pub fn create(config: &StorageConfig) -> Result<Box<dyn RecordLog>> {
        match config.backend.as_str() {
            "filesystem" => Ok(Box::new(FileRecordLog::new(&config.path))),
            "memory" => Ok(Box::new(MemoryLog::new())),
            unknown => bail!(
                "unknown storage backend: '{}'. supported: filesystem, memory",
                unknown
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_create_filesystem_backend() {
        let config = StorageConfig {
            backend: "filesystem".to_string(),
            path: PathBuf::from("/tmp/out.rlog"),
        };
        let log = LogFactory::create(&config).unwrap();
        assert_eq!(log.backend_type(), "filesystem");
    }

    #[test]
    fn test_create_memory_backend() {
        let config = StorageConfig {
            backend: "memory".to_string(),
            path: PathBuf::new(),
        };
        let log = LogFactory::create(&config).unwrap();
        assert_eq!(log.backend_type(), "memory");
    }

    #[test]
    fn test_create_unknown_backend() {
        let config = StorageConfig {
            backend: "s3".to_string(),
            path: PathBuf::new(),
        };
        let err = LogFactory::create(&config).err().unwrap();
        assert!(err.to_string().contains("unknown storage backend"));
    }
}
