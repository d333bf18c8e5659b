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

// Configuration types for channel-recorder

use crate::channel::RecordingScope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub recording: RecordingSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to capture and how deliveries are buffered
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingSettings {
    /// Capture every discovered channel
    #[serde(default)]
    pub all_channels: bool,

    /// Explicit channel names to capture (ignored when all_channels)
    #[serde(default)]
    pub channels: Vec<String>,

    /// Per-channel bound on buffered-but-undelivered messages
    #[serde(default = "default_pending_queue_size")]
    pub pending_queue_size: usize,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            all_channels: false,
            channels: Vec::new(),
            pending_queue_size: default_pending_queue_size(),
        }
    }
}

impl RecordingSettings {
    pub fn scope(&self) -> RecordingScope {
        if self.all_channels {
            RecordingScope::All
        } else {
            RecordingScope::channels(self.channels.iter().cloned())
        }
    }
}

/// Output log destination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend type: "filesystem" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Record file path (filesystem backend)
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_pending_queue_size() -> usize {
    64
}
fn default_backend() -> String {
    "filesystem".to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("recording.rlog")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelDescriptor;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert!(!config.recording.all_channels);
        assert!(config.recording.channels.is_empty());
        assert_eq!(config.recording.pending_queue_size, 64);
        assert_eq!(config.storage.backend, "filesystem");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_scope_from_settings() {
        let descriptor = ChannelDescriptor::new("chassis", "demo.Msg", b"schema".to_vec());

        let mut settings = RecordingSettings::default();
        settings.channels = vec!["chassis".to_string()];
        assert!(settings.scope().should_capture(&descriptor));

        settings.channels = vec!["pose".to_string()];
        assert!(!settings.scope().should_capture(&descriptor));

        settings.all_channels = true;
        assert!(settings.scope().should_capture(&descriptor));
    }
}
