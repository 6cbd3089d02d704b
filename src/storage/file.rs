//! Directory-backed sink: one file per settings key.

use super::SettingsSink;
use crate::error::SinkError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Required permissions for stored settings (Unix: 0600, owner read/write only).
///
/// Settings files may contain encrypted secrets.
#[cfg(unix)]
pub const SETTINGS_FILE_MODE: u32 = 0o600;

/// Suffix appended to the file name of a backup copy.
pub const BACKUP_SUFFIX: &str = "bak";

/// Stores `<dir>/<key>.<extension>` and keeps a single
/// `<key>.<extension>.bak` backup next to it.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    extension: String,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the stored file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, self.extension))
    }

    /// Path of the backup copy for `key`.
    pub fn backup_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.{}", key, self.extension, BACKUP_SUFFIX))
    }

    fn write_atomic(&self, path: &Path, data: &str) -> Result<(), SinkError> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(data.as_bytes())?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(file.path(), fs::Permissions::from_mode(SETTINGS_FILE_MODE))?;
        }

        file.persist(path).map_err(|e| SinkError::Io(e.error))?;
        Ok(())
    }
}

impl SettingsSink for FileSink {
    fn retrieve(&self, key: &str) -> Result<Option<String>, SinkError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => {
                debug!(path = %path.display(), bytes = data.len(), "read settings file");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, data: &str, create_backup: bool) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        if create_backup && path.exists() {
            let backup = self.backup_path_for(key);
            fs::copy(&path, &backup)?;
            debug!(backup = %backup.display(), "backed up settings file");
        }

        self.write_atomic(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "wrote settings file");
        Ok(())
    }

    fn purge(&self, key: &str, create_backup: bool) -> Result<(), SinkError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(());
        }
        if create_backup {
            fs::rename(&path, self.backup_path_for(key))?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!(path = %path.display(), create_backup, "purged settings file");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SinkError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", self.extension);
        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(&suffix)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    fn sink_type(&self) -> &'static str {
        "file"
    }
}
