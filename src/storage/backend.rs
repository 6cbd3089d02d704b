//! Storage sink trait.
//!
//! A sink persists one opaque text blob per settings key:
//! - `FileSink` - one file per key in a directory (default)
//! - `MemorySink` - process-local map, used for tests and ephemeral settings

use crate::error::SinkError;

/// Trait for sinks that handle raw settings persistence.
///
/// `retrieve` returns `Ok(None)` only when nothing has been stored for the
/// key yet; an empty string is a stored value.
pub trait SettingsSink: Send + Sync {
    /// Read the stored representation for `key`.
    fn retrieve(&self, key: &str) -> Result<Option<String>, SinkError>;

    /// Replace the stored representation, keeping a copy of the previous
    /// one when `create_backup` is set.
    fn store(&self, key: &str, data: &str, create_backup: bool) -> Result<(), SinkError>;

    /// Remove the stored representation. Purging a missing key is not an error.
    fn purge(&self, key: &str, create_backup: bool) -> Result<(), SinkError>;

    /// Keys currently stored.
    fn keys(&self) -> Result<Vec<String>, SinkError>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the sink type name.
    fn sink_type(&self) -> &'static str;
}
