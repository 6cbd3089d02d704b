//! Command implementations for the svault CLI.
//!
//! Each command resolves to a result struct implementing [`Output`] so the
//! binary can print it as JSON (default) or human-readable text.
//! - `encrypt` / `decrypt` - codec round trip for a single value
//! - `check` - canonical layout check for a stored settings file
//! - `purge` - remove stored settings
//! - `list` - stored settings keys
//! - `config` - resolved configuration with sources

use crate::config::{ResolvedConfig, ValueSource};
use crate::crypto::EncryptionCodec;
use crate::format::SettingsSerializer;
use crate::storage::SettingsSink;
use crate::{Error, Result};
use serde::Serialize;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&e.to_string()))
}

/// `{"error": message}` with the message escaped.
pub fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Settings keys map to file names, so they must not escape the directory.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("settings name must not be empty".to_string()));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "settings name '{}' must be a plain file stem",
            name
        )));
    }
    Ok(())
}

// === Encrypt / Decrypt ===

#[derive(Debug, Serialize)]
pub struct EncryptResult {
    pub value: String,
}

impl Output for EncryptResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.value.clone()
    }
}

/// Encrypt `value` with the resolved key.
pub fn encrypt(config: &ResolvedConfig, value: &str) -> Result<EncryptResult> {
    let codec = EncryptionCodec::new(config.cipher()?);
    let value = codec.encrypt(Some(value))?.unwrap_or_default();
    Ok(EncryptResult { value })
}

#[derive(Debug, Serialize)]
pub struct DecryptResult {
    pub value: String,
    pub was_encrypted: bool,
}

impl Output for DecryptResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.was_encrypted {
            self.value.clone()
        } else {
            format!("{} (not encrypted)", self.value)
        }
    }
}

/// Decrypt `value` with the resolved key. Values without the marker are
/// returned unchanged.
pub fn decrypt(config: &ResolvedConfig, value: &str) -> Result<DecryptResult> {
    let codec = EncryptionCodec::new(config.cipher()?);
    let was_encrypted = codec.is_encrypted(value);
    let value = codec.decrypt(Some(value))?.unwrap_or_default();
    Ok(DecryptResult {
        value,
        was_encrypted,
    })
}

// === Check ===

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub path: String,
    pub status: &'static str,
    pub fixed: bool,
}

impl Output for CheckResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("{}: {} ({})", self.name, self.status, self.path);
        if self.fixed {
            out.push_str("\n  rewritten in canonical layout, previous data kept as backup");
        }
        out
    }
}

/// Re-render the stored document for `name` and compare it with what is on
/// disk. With `fix`, drifted data is rewritten with a backup.
pub fn check(config: &ResolvedConfig, name: &str, fix: bool) -> Result<CheckResult> {
    validate_name(name)?;
    let sink = config.sink();
    let serializer = config.format().serializer();

    let stored = sink
        .retrieve(name)?
        .ok_or_else(|| Error::NotFound(name.to_string()))?;
    let rendered = serializer.render(&serializer.parse(&stored)?)?;
    let identical = serializer.are_identical(&rendered, &stored);

    let fixed = !identical && fix;
    if fixed {
        sink.store(name, &rendered, true)?;
    }

    Ok(CheckResult {
        name: name.to_string(),
        path: sink.path_for(name).display().to_string(),
        status: if identical { "identical" } else { "drifted" },
        fixed,
    })
}

// === Purge ===

#[derive(Debug, Serialize)]
pub struct PurgeResult {
    pub name: String,
    pub purged: bool,
    pub backup: bool,
}

impl Output for PurgeResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (self.purged, self.backup) {
            (false, _) => format!("{}: nothing stored", self.name),
            (true, true) => format!("Purged {} (backup kept)", self.name),
            (true, false) => format!("Purged {}", self.name),
        }
    }
}

/// Remove stored settings for `name`. Purging a missing key succeeds.
pub fn purge(config: &ResolvedConfig, name: &str, backup: bool) -> Result<PurgeResult> {
    validate_name(name)?;
    let sink = config.sink();
    let purged = sink.retrieve(name)?.is_some();
    sink.purge(name, backup)?;
    Ok(PurgeResult {
        name: name.to_string(),
        purged,
        backup: purged && backup,
    })
}

// === List ===

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub dir: String,
    pub format: String,
    pub count: usize,
    pub keys: Vec<String>,
}

impl Output for ListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.keys.is_empty() {
            return format!("No stored settings in {}", self.dir);
        }
        let mut lines = vec![format!(
            "{} stored settings in {} ({}):",
            self.count, self.dir, self.format
        )];
        lines.extend(self.keys.iter().map(|k| format!("  {}", k)));
        lines.join("\n")
    }
}

/// List keys stored in the resolved directory.
pub fn list(config: &ResolvedConfig) -> Result<ListResult> {
    let sink = config.sink();
    let keys = sink.keys()?;
    Ok(ListResult {
        dir: sink.location(),
        format: config.format().to_string(),
        count: keys.len(),
        keys,
    })
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    pub config_file: Option<String>,
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(path) = &self.config_file {
            lines.push(format!("Config file: {}", path));
        }
        for entry in &self.entries {
            lines.push(format!("{} = {} ({})", entry.key, entry.value, entry.source));
        }
        lines.join("\n")
    }
}

/// Show resolved configuration. The passphrase is always masked.
pub fn config_show(config: &ResolvedConfig) -> Result<ConfigShowResult> {
    let entry = |key, value: String, source: &ValueSource| ConfigEntry {
        key,
        value,
        source: source.to_string(),
    };

    let mut entries = vec![
        entry("dir", config.dir().display().to_string(), &config.dir.source),
        entry("format", config.format().to_string(), &config.format.source),
        entry("cache", config.cache().to_string(), &config.cache.source),
        entry("max-depth", config.max_depth().to_string(), &config.max_depth.source),
    ];
    entries.push(match (&config.passphrase, config.masked_passphrase()) {
        (Some(resolved), Some(masked)) => entry("key", masked, &resolved.source),
        _ => entry("key", "(built-in)".to_string(), &ValueSource::Default),
    });

    Ok(ConfigShowResult {
        config_file: config.config_file.as_ref().map(|p| p.display().to_string()),
        entries,
    })
}
