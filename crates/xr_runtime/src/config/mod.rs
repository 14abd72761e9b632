//! Configuration system

pub use serde::{Serialize, Deserialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        // Try different formats
        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Supported on-disk formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("ron") => Ok(ConfigFormat::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// # Swapchain Limits
///
/// Upper bounds checked when a swapchain descriptor is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapchainLimits {
    /// Most images a single swapchain ring may hold
    pub max_image_count: u32,
    /// Largest width or height in pixels
    pub max_dimension: u32,
}

impl Default for SwapchainLimits {
    fn default() -> Self {
        Self {
            max_image_count: 8,
            max_dimension: 16384,
        }
    }
}

/// # Runtime Configuration
///
/// Top-level settings for a runtime instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Descriptor limits for every swapchain manager
    pub swapchain: SwapchainLimits,
    /// Timeout used by callers that do not pass their own, in milliseconds
    pub default_wait_timeout_ms: u64,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl RuntimeConfig {
    /// [`default_wait_timeout_ms`](Self::default_wait_timeout_ms) as a `Duration`
    pub fn default_wait_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.default_wait_timeout_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            swapchain: SwapchainLimits::default(),
            default_wait_timeout_ms: 100,
            log_filter: "info".to_string(),
        }
    }
}

impl Config for RuntimeConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("xr_runtime_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            default_wait_timeout_ms = 250

            [swapchain]
            max_image_count = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.default_wait_timeout_ms, 250);
        assert_eq!(config.swapchain.max_image_count, 4);
        assert_eq!(config.swapchain.max_dimension, 16384);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_toml_and_ron_files_round_trip() {
        let mut config = RuntimeConfig::default();
        config.swapchain.max_image_count = 5;
        config.log_filter = "xr_runtime=debug".to_string();

        for name in ["runtime.toml", "runtime.ron"] {
            let path = temp_path(name);
            config.save_to_file(&path).unwrap();
            let loaded = RuntimeConfig::load_from_file(&path).unwrap();
            std::fs::remove_file(&path).ok();
            assert_eq!(loaded, config);
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = RuntimeConfig::default().save_to_file(temp_path("runtime.yaml"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
