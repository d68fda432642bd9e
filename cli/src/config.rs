//! CLI Configuration
//!
//! Handles loading and saving the hook configuration from TOML files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cloak::RuntimeConfig;
use cloak_defi::HookConfig;
use cloak_fhe::{FHEConfig, OracleConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloakConfig {
    /// Hook identity and tracking mode
    #[serde(default)]
    pub hook: HookConfig,

    /// Ciphertext backend
    #[serde(default)]
    pub coprocessor: CoprocessorSettings,

    /// Decryption oracle scheduling
    #[serde(default)]
    pub oracle: OracleSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl CloakConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise from the default location if it
    /// exists, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Configuration for a specific backend
    pub fn for_backend(backend: BackendKind) -> Self {
        match backend {
            BackendKind::Clear => Self::simulation(),
            BackendKind::Tfhe => Self::confidential(),
        }
    }

    /// Plaintext simulation with a fast synchronous oracle
    pub fn simulation() -> Self {
        Self {
            coprocessor: CoprocessorSettings {
                backend: BackendKind::Clear,
                ..Default::default()
            },
            oracle: OracleSettings {
                schedule: OracleConfig {
                    fulfil_interval_ms: 10,
                    ..Default::default()
                },
                background: false,
            },
            ..Default::default()
        }
    }

    /// TFHE ciphertexts with the background oracle worker
    pub fn confidential() -> Self {
        Self {
            coprocessor: CoprocessorSettings {
                backend: BackendKind::Tfhe,
                ..Default::default()
            },
            oracle: OracleSettings {
                background: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Settings for the runtime
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            hook: self.hook.clone(),
            oracle: self.oracle.schedule.clone(),
            ..Default::default()
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hook.address.is_zero() {
            return Err(ConfigError::Invalid(
                "Hook address cannot be the zero address".to_string()
            ));
        }

        if self.oracle.schedule.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "Oracle batch size must be greater than 0".to_string()
            ));
        }

        if self.oracle.schedule.fulfil_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Oracle fulfil interval must be greater than 0".to_string()
            ));
        }

        if self.coprocessor.backend == BackendKind::Tfhe && self.coprocessor.fhe.security_bits < 128 {
            return Err(ConfigError::Invalid(
                "TFHE backend requires at least 128-bit security".to_string()
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "Unknown log format '{}' (expected text or json)",
                self.logging.format
            )));
        }

        Ok(())
    }
}

/// Ciphertext backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Plaintext simulation, not confidential
    #[default]
    Clear,
    /// TFHE-rs FheUint64
    Tfhe,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Clear => write!(f, "clear"),
            BackendKind::Tfhe => write!(f, "tfhe"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(BackendKind::Clear),
            "tfhe" => Ok(BackendKind::Tfhe),
            other => Err(ConfigError::Invalid(format!("Unknown backend '{}'", other))),
        }
    }
}

/// Coprocessor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoprocessorSettings {
    /// Backend (clear, tfhe)
    #[serde(default)]
    pub backend: BackendKind,

    /// TFHE parameters, ignored by the clear backend
    #[serde(flatten)]
    pub fhe: FHEConfig,
}

/// Oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Round interval and batch size
    #[serde(flatten)]
    pub schedule: OracleConfig,

    /// Run the oracle as a background worker instead of on demand
    pub background: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            schedule: OracleConfig::default(),
            background: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default config directory
pub fn default_config_dir() -> PathBuf {
    directories::ProjectDirs::from("network", "cloak", "cloak")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cloak"))
}

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloak_defi::TrackingMode;
    use cloak_fhe::Address;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CloakConfig::default();
        assert_eq!(config.coprocessor.backend, BackendKind::Clear);
        assert_eq!(config.hook.tracking, TrackingMode::Token0Only);
        assert!(config.oracle.background);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_profiles() {
        assert_eq!(CloakConfig::for_backend(BackendKind::Clear).coprocessor.backend, BackendKind::Clear);
        assert!(!CloakConfig::simulation().oracle.background);

        let confidential = CloakConfig::for_backend(BackendKind::Tfhe);
        assert_eq!(confidential.coprocessor.backend, BackendKind::Tfhe);
        assert_eq!(confidential.coprocessor.fhe.security_bits, 128);
    }

    #[test]
    fn test_save_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CloakConfig::confidential();
        config.hook.tracking = TrackingMode::Symmetric;
        config.save(&path).unwrap();

        let loaded = CloakConfig::load(&path).unwrap();
        assert_eq!(loaded.coprocessor.backend, BackendKind::Tfhe);
        assert_eq!(loaded.hook.tracking, TrackingMode::Symmetric);
        assert_eq!(loaded.hook.address, config.hook.address);
        assert_eq!(loaded.oracle.schedule.batch_size, config.oracle.schedule.batch_size);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CloakConfig = toml::from_str(
            r#"
            [hook]
            tracking = "symmetric"

            [oracle]
            batch_size = 4
            background = false
            "#,
        )
        .unwrap();

        assert_eq!(config.hook.tracking, TrackingMode::Symmetric);
        assert_eq!(config.oracle.schedule.batch_size, 4);
        assert_eq!(config.oracle.schedule.fulfil_interval_ms, 250);
        assert!(!config.oracle.background);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let err = CloakConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = CloakConfig::default();
        config.hook.address = Address::ZERO;
        assert!(config.validate().is_err());

        let mut config = CloakConfig::default();
        config.oracle.schedule.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = CloakConfig::confidential();
        config.coprocessor.fhe.security_bits = 80;
        assert!(config.validate().is_err());

        let mut config = CloakConfig::default();
        config.logging.format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("tfhe".parse::<BackendKind>().unwrap(), BackendKind::Tfhe);
        assert!("gpu".parse::<BackendKind>().is_err());
    }
}
