//! Typed errors for each layer of the settings pipeline.
//!
//! Collaborator failures (sink, serializer, codec) are wrapped at the
//! manager boundary into [`LoadError`], [`SaveError`] or [`DeleteError`],
//! keeping the settings key and the original error as the source.

use thiserror::Error;

/// Failure reported by a [`SettingsSink`](crate::storage::SettingsSink).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure reported by a [`SettingsSerializer`](crate::format::SettingsSerializer).
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML render error: {0}")]
    TomlRender(#[from] toml::ser::Error),

    /// The document cannot be represented in the target format.
    #[error("unsupported document shape: {0}")]
    Shape(String),
}

/// Failure inside the encryption codec or its cipher.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 ciphertext: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decrypted value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// A property whose value could not be read during traversal.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PropertyError(pub String);

impl PropertyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error returned from loading settings.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("settings `{key}` are not stored and creation was prevented")]
    Unavailable { key: &'static str },

    #[error("failed to retrieve settings `{key}`")]
    Retrieve {
        key: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("failed to deserialize settings `{key}`")]
    Deserialize {
        key: &'static str,
        #[source]
        source: SerializeError,
    },

    #[error("failed to compare settings `{key}` with stored data")]
    Compare {
        key: &'static str,
        #[source]
        source: SerializeError,
    },

    #[error("failed to decrypt settings `{key}`")]
    Decrypt {
        key: &'static str,
        #[source]
        source: CodecError,
    },

    /// Persisting a default or a drifted instance failed.
    #[error(transparent)]
    Persist(#[from] SaveError),
}

/// Error returned from saving settings.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to serialize settings `{key}`")]
    Serialize {
        key: &'static str,
        #[source]
        source: SerializeError,
    },

    #[error("failed to store settings `{key}`")]
    Store {
        key: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("failed to encrypt settings `{key}`")]
    Encrypt {
        key: &'static str,
        #[source]
        source: CodecError,
    },
}

/// Error returned from deleting settings.
#[derive(Debug, Error)]
#[error("failed to purge settings `{key}`")]
pub struct DeleteError {
    pub key: &'static str,
    #[source]
    pub source: SinkError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_load_error_keeps_cause() {
        let err = LoadError::Retrieve {
            key: "app",
            source: SinkError::Other("disk on fire".to_string()),
        };
        assert_eq!(err.to_string(), "failed to retrieve settings `app`");
        assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn test_persist_is_transparent() {
        let err: LoadError = SaveError::Store {
            key: "app",
            source: SinkError::Other("read-only".to_string()),
        }
        .into();
        assert_eq!(err.to_string(), "failed to store settings `app`");
    }

    #[test]
    fn test_unavailable_message() {
        let err = LoadError::Unavailable { key: "app" };
        assert!(err.to_string().contains("creation was prevented"));
    }
}
