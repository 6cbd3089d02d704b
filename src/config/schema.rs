//! TOML schema for `config.toml`.
//!
//! ```toml
//! dir = "/home/me/.local/share/settings-vault"
//! format = "toml"   # or "json"
//! cache = "weak"    # "strong", "weak" or "none"
//! max-depth = 64
//! ```

use crate::cache::CachePolicy;
use crate::format::Format;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Largest accepted traversal depth.
pub const MAX_DEPTH_LIMIT: usize = 10_000;

/// User preferences stored in config.toml. Every value is optional; unset
/// values fall through to environment variables and built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct VaultConfig {
    /// Directory holding stored settings files
    pub dir: Option<PathBuf>,

    /// Stored format for settings files
    pub format: Option<Format>,

    /// Cache policy for stores built with `ResolvedConfig::open_store`
    pub cache: Option<CachePolicy>,

    /// Maximum traversal depth for stores built with `ResolvedConfig::open_store`
    pub max_depth: Option<usize>,
}

impl VaultConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(depth) = self.max_depth {
            if depth == 0 || depth > MAX_DEPTH_LIMIT {
                return Err(format!(
                    "max-depth must be 1-{}, got {}",
                    MAX_DEPTH_LIMIT, depth
                ));
            }
        }
        if let Some(dir) = &self.dir {
            if dir.as_os_str().is_empty() {
                return Err("dir must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Read the config file at `path`. A missing file is an empty config.
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge another config into this one (other's values take precedence).
    pub fn merge(&mut self, other: &VaultConfig) {
        if other.dir.is_some() {
            self.dir = other.dir.clone();
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== VaultConfig Tests ====================

    #[test]
    fn test_config_default() {
        let config = VaultConfig::default();
        assert!(config.dir.is_none());
        assert!(config.format.is_none());
        assert!(config.cache.is_none());
        assert!(config.max_depth.is_none());
    }

    #[test]
    fn test_config_validate_valid() {
        let config = VaultConfig {
            max_depth: Some(64),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_invalid_depth() {
        let config = VaultConfig {
            max_depth: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("max-depth"));
    }

    #[test]
    fn test_config_from_toml_full() {
        let config = VaultConfig::from_toml(
            r#"
dir = "/tmp/vault"
format = "toml"
cache = "weak"
max-depth = 12
"#,
        )
        .unwrap();
        assert_eq!(config.dir, Some(PathBuf::from("/tmp/vault")));
        assert_eq!(config.format, Some(Format::Toml));
        assert_eq!(config.cache, Some(CachePolicy::Weak));
        assert_eq!(config.max_depth, Some(12));
    }

    #[test]
    fn test_config_from_toml_rejects_unknown_keys() {
        let err = VaultConfig::from_toml("colour = \"blue\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_from_toml_rejects_invalid_values() {
        assert!(VaultConfig::from_toml("format = \"yaml\"\n").is_err());
        assert!(VaultConfig::from_toml("max-depth = 0\n").is_err());
    }

    #[test]
    fn test_config_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = VaultConfig::read(&temp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, VaultConfig::new());
    }

    #[test]
    fn test_config_read_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "cache = \"none\"\n").unwrap();
        let config = VaultConfig::read(&path).unwrap();
        assert_eq!(config.cache, Some(CachePolicy::None));
    }

    #[test]
    fn test_config_merge() {
        let mut base = VaultConfig {
            dir: Some(PathBuf::from("/base")),
            format: Some(Format::Json),
            cache: None,
            max_depth: Some(10),
        };
        let other = VaultConfig {
            dir: None,
            format: Some(Format::Toml),
            cache: Some(CachePolicy::Weak),
            max_depth: None,
        };
        base.merge(&other);

        assert_eq!(base.dir, Some(PathBuf::from("/base")));
        assert_eq!(base.format, Some(Format::Toml));
        assert_eq!(base.cache, Some(CachePolicy::Weak));
        assert_eq!(base.max_depth, Some(10));
    }
}
