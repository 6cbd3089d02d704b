//! Storage layer for settings data.
//!
//! The manager only sees the [`SettingsSink`] contract: retrieve, store and
//! purge one text blob per settings key, with optional backup.
//!
//! ## Sinks
//!
//! - **File sink** (default): `<dir>/<key>.<ext>` with a `<key>.<ext>.bak` backup
//! - **Memory sink**: process-local map with operation counters

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::SettingsSink;
pub use file::{BACKUP_SUFFIX, FileSink};
#[cfg(unix)]
pub use file::SETTINGS_FILE_MODE;
pub use memory::MemorySink;

use crate::Result;
use std::path::PathBuf;

/// Default settings directory: `<data dir>/settings-vault`.
pub fn default_settings_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("settings-vault"))
        .ok_or_else(|| crate::Error::Config("could not determine data directory".to_string()))
}
