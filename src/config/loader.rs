// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // Parse YAML
        let config: RecorderConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${RECORDER_OUTPUT:-capture.rlog} -> capture.rlog (if RECORDER_OUTPUT not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &RecorderConfig) -> Result<()> {
        if config.recording.pending_queue_size == 0 {
            bail!("recording.pending_queue_size must be > 0");
        }

        if config.recording.channels.iter().any(|name| name.is_empty()) {
            bail!("recording.channels must not contain empty names");
        }

        match config.storage.backend.as_str() {
            "filesystem" => {
                if config.storage.path.as_os_str().is_empty() {
                    bail!("storage.path cannot be empty for the filesystem backend");
                }
            }
            "memory" => {}
            unknown => bail!(
                "Unknown storage backend: '{}'. Supported: filesystem, memory",
                unknown
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_RECORDER_VAR", "test_value");

        let input = "path: ${TEST_RECORDER_VAR}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "path: test_value");

        std::env::remove_var("TEST_RECORDER_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("TEST_RECORDER_VAR2");

        let input = "path: ${TEST_RECORDER_VAR2:-capture.rlog}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "path: capture.rlog");
    }

    #[test]
    fn test_validation_zero_queue_size() {
        let mut config = RecorderConfig::default();
        config.recording.pending_queue_size = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("pending_queue_size"));
    }

    #[test]
    fn test_validation_empty_channel_name() {
        let mut config = RecorderConfig::default();
        config.recording.channels = vec!["chassis".to_string(), String::new()];

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_unknown_backend() {
        let mut config = RecorderConfig::default();
        config.storage.backend = "reductstore".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown storage"));
    }

    #[test]
    fn test_load_yaml_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "recording:\n  all_channels: true\n  pending_queue_size: 16\nstorage:\n  backend: memory\n",
        )
        .unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert!(config.recording.all_channels);
        assert_eq!(config.recording.pending_queue_size, 16);
        assert_eq!(config.storage.backend, "memory");
    }
}
