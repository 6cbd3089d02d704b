//! Unified precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`SVAULT_DIR`, `SVAULT_FORMAT`, `SVAULT_CACHE`, `SVAULT_KEY`)
//! 3. config.toml (`~/.config/settings-vault/config.toml` or `$SVAULT_CONFIG_DIR/config.toml`)
//! 4. Built-in defaults
//!
//! The passphrase is never read from config.toml.

use crate::cache::CachePolicy;
use crate::config::schema::{CONFIG_FILE, VaultConfig};
use crate::crypto::{AesGcmCipher, EncryptionCodec};
use crate::encrypted::EncryptedStore;
use crate::format::Format;
use crate::manager::SettingsManager;
use crate::storage::{FileSink, default_settings_dir};
use crate::traverse::DEFAULT_MAX_DEPTH;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the settings directory.
pub const SVAULT_DIR_ENV: &str = "SVAULT_DIR";
/// Environment variable overriding the stored format.
pub const SVAULT_FORMAT_ENV: &str = "SVAULT_FORMAT";
/// Environment variable overriding the cache policy.
pub const SVAULT_CACHE_ENV: &str = "SVAULT_CACHE";
/// Environment variable holding the encryption passphrase.
pub const SVAULT_KEY_ENV: &str = "SVAULT_KEY";
/// Environment variable overriding the directory that holds config.toml.
pub const SVAULT_CONFIG_DIR_ENV: &str = "SVAULT_CONFIG_DIR";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.toml at the given path
    ConfigFile(String),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "file:{}", path),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory holding stored settings
    pub dir: Resolved<PathBuf>,
    /// Stored format
    pub format: Resolved<Format>,
    /// Cache policy
    pub cache: Resolved<CachePolicy>,
    /// Traversal depth bound for encryption
    pub max_depth: Resolved<usize>,
    /// Encryption passphrase; `None` means the built-in key
    pub passphrase: Option<Resolved<String>>,
    /// config.toml path that was consulted, if one could be determined
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn dir(&self) -> &Path {
        &self.dir.value
    }

    pub fn format(&self) -> Format {
        self.format.value
    }

    pub fn cache(&self) -> CachePolicy {
        self.cache.value
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.value
    }

    /// Get the passphrase value, if set.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|r| r.value.as_str())
    }

    /// Get the masked passphrase for display purposes.
    pub fn masked_passphrase(&self) -> Option<String> {
        self.passphrase.as_ref().map(|r| {
            let chars: Vec<char> = r.value.chars().collect();
            if chars.len() <= 8 {
                "****".to_string()
            } else {
                let head: String = chars[..2].iter().collect();
                let tail: String = chars[chars.len() - 2..].iter().collect();
                format!("{}...{}", head, tail)
            }
        })
    }

    /// Build the cipher for the resolved passphrase.
    pub fn cipher(&self) -> Result<AesGcmCipher> {
        match self.passphrase() {
            Some(passphrase) => Ok(AesGcmCipher::from_passphrase(passphrase)?),
            None => Ok(AesGcmCipher::builtin()),
        }
    }

    /// File sink for the resolved directory and format.
    pub fn sink(&self) -> FileSink {
        FileSink::new(self.dir.value.clone(), self.format.value.serializer().extension())
    }

    /// Assemble an encrypting store from the resolved values.
    pub fn open_store(&self) -> Result<EncryptedStore<SettingsManager>> {
        let manager = SettingsManager::new(
            Arc::new(self.sink()),
            self.format.value.serializer(),
            self.cache.value.build(),
        );
        let codec = EncryptionCodec::new(self.cipher()?);
        Ok(EncryptedStore::with_codec(manager, codec).with_max_depth(self.max_depth.value))
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Settings directory override from CLI flag
    pub dir: Option<PathBuf>,
    /// Format override from CLI flag
    pub format: Option<Format>,
    /// Cache policy override from CLI flag
    pub cache: Option<CachePolicy>,
    /// Passphrase override from CLI flag
    pub passphrase: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

/// Location of config.toml: `$SVAULT_CONFIG_DIR/config.toml`, falling back
/// to the platform config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(dir) = env_value(SVAULT_CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join(CONFIG_FILE));
    }
    dirs::config_dir().map(|d| d.join("settings-vault").join(CONFIG_FILE))
}

/// Non-empty environment variable value.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str, parse: fn(&str) -> Option<T>) -> Result<Option<Resolved<T>>> {
    match env_value(name) {
        Some(raw) => parse(&raw)
            .map(|value| Some(Resolved::new(value, ValueSource::EnvVar(name.to_string()))))
            .ok_or_else(|| Error::Config(format!("invalid value for {}: {}", name, raw))),
        None => Ok(None),
    }
}

/// Resolve configuration with full precedence chain, reading config.toml
/// from [`config_file_path`].
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let path = config_file_path();
    let file = match &path {
        Some(path) => VaultConfig::read(path)?,
        None => VaultConfig::new(),
    };
    resolve_config_with(&file, path.as_deref(), overrides)
}

/// Resolve configuration against an already loaded config file.
pub fn resolve_config_with(
    file: &VaultConfig,
    file_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let file_source = || {
        ValueSource::ConfigFile(
            file_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| CONFIG_FILE.to_string()),
        )
    };

    // Resolve dir
    let dir = if let Some(dir) = &overrides.dir {
        Resolved::new(dir.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env_value(SVAULT_DIR_ENV) {
        Resolved::new(PathBuf::from(dir), ValueSource::EnvVar(SVAULT_DIR_ENV.to_string()))
    } else if let Some(dir) = &file.dir {
        Resolved::new(dir.clone(), file_source())
    } else {
        Resolved::new(default_settings_dir()?, ValueSource::Default)
    };

    // Resolve format
    let format = if let Some(format) = overrides.format {
        Resolved::new(format, ValueSource::CliFlag)
    } else if let Some(format) = env_parsed(SVAULT_FORMAT_ENV, Format::parse)? {
        format
    } else if let Some(format) = file.format {
        Resolved::new(format, file_source())
    } else {
        Resolved::new(Format::default(), ValueSource::Default)
    };

    // Resolve cache
    let cache = if let Some(cache) = overrides.cache {
        Resolved::new(cache, ValueSource::CliFlag)
    } else if let Some(cache) = env_parsed(SVAULT_CACHE_ENV, CachePolicy::parse)? {
        cache
    } else if let Some(cache) = file.cache {
        Resolved::new(cache, file_source())
    } else {
        Resolved::new(CachePolicy::default(), ValueSource::Default)
    };

    let max_depth = match file.max_depth {
        Some(depth) => Resolved::new(depth, file_source()),
        None => Resolved::new(DEFAULT_MAX_DEPTH, ValueSource::Default),
    };

    // Resolve passphrase; remains None for the built-in key
    let passphrase = if let Some(passphrase) = &overrides.passphrase {
        Some(Resolved::new(passphrase.clone(), ValueSource::CliFlag))
    } else {
        env_value(SVAULT_KEY_ENV)
            .map(|key| Resolved::new(key, ValueSource::EnvVar(SVAULT_KEY_ENV.to_string())))
    };

    Ok(ResolvedConfig {
        dir,
        format,
        cache,
        max_depth,
        passphrase,
        config_file: file_path.map(Path::to_path_buf),
    })
}
