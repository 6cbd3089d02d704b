//! Settings Vault - typed settings persistence for applications.
//!
//! This library provides the core functionality for the `svault` CLI tool:
//! loading and saving strongly-typed settings objects with default creation,
//! drift detection, per-type caching and field-level encryption.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use settings_vault::{
//!     EncryptedStore, JsonSerializer, MemorySink, Settings, SettingsManager, SettingsStore,
//!     StrongCache, traversable,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Service {
//!     endpoint: String,
//!     api_key: String,
//! }
//!
//! traversable!(Service {
//!     endpoint,
//!     #[encrypt]
//!     api_key,
//! });
//!
//! impl Settings for Service {}
//!
//! let manager = SettingsManager::new(
//!     Arc::new(MemorySink::new()),
//!     Arc::new(JsonSerializer),
//!     Arc::new(StrongCache::new()),
//! );
//! let store = EncryptedStore::new(manager);
//!
//! let service = store.load::<Service>()?;
//! service.write().api_key = "s3cret".to_string();
//! store.save(&service)?;
//! assert_eq!(service.read().api_key, "s3cret");
//! # Ok::<(), settings_vault::Error>(())
//! ```

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod encrypted;
pub mod error;
pub mod format;
pub mod manager;
pub mod settings;
pub mod storage;
pub mod traverse;

pub use cache::{CacheExt, CachePolicy, NoCache, SettingsCache, StrongCache, WeakCache};
pub use crypto::{AesGcmCipher, Cipher, ENCRYPTION_MARKER, EncryptionCodec};
pub use encrypted::EncryptedStore;
pub use error::{CodecError, DeleteError, LoadError, PropertyError, SaveError, SerializeError, SinkError};
pub use format::{Format, JsonSerializer, SerializerExt, SettingsSerializer, TomlSerializer};
pub use manager::{DeleteOptions, LoadOptions, LoadOrigin, Loaded, SaveOptions, SettingsManager, SettingsStore};
pub use settings::{Handle, Settings};
pub use storage::{FileSink, MemorySink, SettingsSink};
pub use traverse::{Field, Marker, Property, PropertyDescriptor, PropertyWalker, Slot, Traverse, walk};

/// Library-level error type for Settings Vault operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Settings Vault operations.
pub type Result<T> = std::result::Result<T, Error>;
