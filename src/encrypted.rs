//! Transparent field encryption on top of any [`SettingsStore`].
//!
//! Stored data carries ciphertext for every `#[encrypt]` property while the
//! in-memory instance handed to callers always holds plaintext. Saves
//! encrypt a private copy, so a shared handle never holds ciphertext.

use crate::cache::{CacheExt, SettingsCache};
use crate::crypto::{AesGcmCipher, Cipher, EncryptionCodec};
use crate::error::{CodecError, DeleteError, LoadError, SaveError, SerializeError};
use crate::manager::{DeleteOptions, LoadOptions, LoadOrigin, Loaded, SaveOptions, SettingsStore};
use crate::settings::Settings;
use crate::traverse::{DEFAULT_MAX_DEPTH, Traverse, walk_with_depth};
use std::sync::Arc;
use tracing::debug;

/// Wraps an inner store, encrypting marked properties on save and
/// decrypting them on load.
pub struct EncryptedStore<S, C = AesGcmCipher> {
    inner: S,
    codec: EncryptionCodec<C>,
    max_depth: usize,
}

impl<S: SettingsStore> EncryptedStore<S> {
    /// Wrap `inner` using the built-in key.
    pub fn new(inner: S) -> Self {
        Self::with_codec(inner, EncryptionCodec::default())
    }
}

impl<S: SettingsStore, C: Cipher> EncryptedStore<S, C> {
    pub fn with_codec(inner: S, codec: EncryptionCodec<C>) -> Self {
        Self {
            inner,
            codec,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn codec(&self) -> &EncryptionCodec<C> {
        &self.codec
    }

    /// Decrypt every non-blank candidate in place.
    ///
    /// Returns `true` when at least one value was still plaintext, i.e. the
    /// instance should be written back so storage is consistently encrypted.
    pub fn decrypt_properties(&self, settings: &mut dyn Traverse) -> Result<bool, CodecError> {
        let mut needs_encryption = false;
        for mut property in walk_with_depth(settings, self.max_depth) {
            let Some(current) = property.current().filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let decrypted = self.codec.decrypt(Some(current))?.unwrap_or_default();
            if decrypted.to_lowercase() == current.to_lowercase() {
                needs_encryption = true;
            } else {
                property.set(Some(decrypted));
            }
        }
        Ok(needs_encryption)
    }

    /// Encrypt every non-blank candidate in place.
    ///
    /// Every value is treated as plaintext, including one that happens to
    /// contain the marker, so calling this twice encrypts twice.
    pub fn encrypt_properties(&self, settings: &mut dyn Traverse) -> Result<(), CodecError> {
        for mut property in walk_with_depth(settings, self.max_depth) {
            let Some(current) = property.current().filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let encrypted = self.codec.encrypt(Some(current))?;
            if encrypted.as_deref() != Some(current) {
                debug!(property = property.name(), "encrypted property");
                property.set(encrypted);
            }
        }
        Ok(())
    }
}

/// Independent copy of `settings` with the same serialized state.
fn detached_copy<T: Settings>(settings: &T) -> Result<T, serde_json::Error> {
    serde_json::to_value(settings).and_then(serde_json::from_value)
}

impl<S: SettingsStore, C: Cipher> SettingsStore for EncryptedStore<S, C> {
    fn load_with<T: Settings>(&self, options: LoadOptions) -> Result<Loaded<T>, LoadError> {
        let cache = self.inner.cache();
        if !options.bypass_cache {
            // cached instances were decrypted when first loaded
            if let Some(handle) = cache.try_get::<T>() {
                debug!(key = T::key(), "settings cache hit");
                return Ok(Loaded {
                    handle,
                    origin: LoadOrigin::Cache,
                });
            }
        }

        // the instance stays private until it holds plaintext
        let inner_options = options.with_bypass_cache(true).with_defer_loaded(true);
        let Loaded { handle, origin } = self.inner.load_with::<T>(inner_options)?;

        let key = T::key();
        {
            let mut settings = handle.write();
            let needs_encryption = self
                .decrypt_properties(&mut *settings)
                .map_err(|source| LoadError::Decrypt { key, source })?;
            if needs_encryption && !options.prevent_update {
                debug!(key, "stored settings contain plaintext secrets, re-encrypting");
                self.persist(&*settings, SaveOptions::default())?;
            }
            if !options.defer_loaded {
                settings.loaded();
            }
        }

        if options.bypass_cache {
            return Ok(Loaded { handle, origin });
        }
        let (hit, handle) = cache.get_or_add(handle);
        let origin = if hit { LoadOrigin::Cache } else { origin };
        Ok(Loaded { handle, origin })
    }

    fn persist<T: Settings>(&self, settings: &T, options: SaveOptions) -> Result<(), SaveError> {
        let key = T::key();
        let mut encrypted = detached_copy(settings).map_err(|e| SaveError::Serialize {
            key,
            source: SerializeError::Json(e),
        })?;
        self.encrypt_properties(&mut encrypted)
            .map_err(|source| SaveError::Encrypt { key, source })?;
        self.inner.persist(&encrypted, options)
    }

    fn delete_with<T: Settings>(&self, options: DeleteOptions) -> Result<(), DeleteError> {
        self.inner.delete_with::<T>(options)
    }

    fn cache(&self) -> &Arc<dyn SettingsCache> {
        self.inner.cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoCache, StrongCache};
    use crate::crypto::ENCRYPTION_MARKER;
    use crate::format::{JsonSerializer, SerializerExt};
    use crate::manager::SettingsManager;
    use crate::settings::handle;
    use crate::storage::MemorySink;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Account {
        user: String,
        password: String,
        blank: String,
    }

    crate::traversable!(Account {
        user,
        #[encrypt]
        password,
        #[encrypt]
        blank,
    });

    impl Settings for Account {}

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Observed {
        secret: String,
        #[serde(skip)]
        seen: Vec<String>,
    }

    crate::traversable!(Observed {
        #[encrypt]
        secret,
    });

    impl Settings for Observed {
        fn loaded(&mut self) {
            self.seen.push(self.secret.clone());
        }
    }

    fn account() -> Account {
        Account {
            user: "ada".into(),
            password: "hunter2".into(),
            blank: "   ".into(),
        }
    }

    fn store(sink: Arc<MemorySink>) -> EncryptedStore<SettingsManager> {
        cached_store(sink, Arc::new(NoCache))
    }

    fn cached_store(sink: Arc<MemorySink>, cache: Arc<dyn SettingsCache>) -> EncryptedStore<SettingsManager> {
        EncryptedStore::new(SettingsManager::new(sink, Arc::new(JsonSerializer), cache))
    }

    #[test]
    fn test_decrypt_reports_plaintext() {
        let s = store(Arc::new(MemorySink::new()));
        let mut a = account();
        assert!(s.decrypt_properties(&mut a).unwrap());
        assert_eq!(a.password, "hunter2");
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let s = store(Arc::new(MemorySink::new()));
        let mut a = account();
        s.encrypt_properties(&mut a).unwrap();
        assert!(a.password.contains(ENCRYPTION_MARKER));
        assert_eq!(a.user, "ada");
        assert_eq!(a.blank, "   ");

        assert!(!s.decrypt_properties(&mut a).unwrap());
        assert_eq!(a.password, "hunter2");
    }

    #[test]
    fn test_secret_containing_marker_round_trips() {
        let sink = Arc::new(MemorySink::new());
        let s = store(Arc::clone(&sink));
        let secret = format!("pa{}ss", ENCRYPTION_MARKER);
        let settings = handle(Account {
            password: secret.clone(),
            ..account()
        });
        s.save(&settings).unwrap();

        let stored = sink.peek("Account").unwrap();
        assert!(!stored.contains(&secret));
        assert_eq!(settings.read().password, secret);
        assert_eq!(s.load::<Account>().unwrap().read().password, secret);
    }

    #[test]
    fn test_blank_values_do_not_count() {
        let s = store(Arc::new(MemorySink::new()));
        let mut a = Account::default();
        assert!(!s.decrypt_properties(&mut a).unwrap());
    }

    #[test]
    fn test_save_stores_ciphertext_keeps_plaintext() {
        let sink = Arc::new(MemorySink::new());
        let s = store(Arc::clone(&sink));
        let settings = handle(account());
        s.save(&settings).unwrap();

        let stored = sink.peek("Account").unwrap();
        assert!(!stored.contains("hunter2"));
        assert!(stored.contains(ENCRYPTION_MARKER));
        assert_eq!(settings.read().password, "hunter2");
    }

    #[test]
    fn test_readers_never_see_ciphertext_during_save() {
        let s = cached_store(Arc::new(MemorySink::new()), Arc::new(StrongCache::new()));
        let shared = handle(account());
        s.save(&shared).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..200 {
                    s.save(&shared).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..2000 {
                    let loaded = s.load::<Account>().unwrap();
                    assert_eq!(loaded.read().password, "hunter2");
                }
            });
        });
        assert_eq!(shared.read().password, "hunter2");
    }

    #[test]
    fn test_load_decrypts() {
        let sink = Arc::new(MemorySink::new());
        let s = store(Arc::clone(&sink));
        s.save(&handle(account())).unwrap();
        let stores = sink.store_count();

        let loaded = s.load::<Account>().unwrap();
        assert_eq!(loaded.read().password, "hunter2");
        assert_eq!(sink.store_count(), stores);
    }

    #[test]
    fn test_load_reencrypts_plaintext_storage() {
        let plaintext = JsonSerializer.serialize(&account()).unwrap();
        let sink = Arc::new(MemorySink::with_entry("Account", plaintext));
        let s = store(Arc::clone(&sink));

        let loaded = s.load::<Account>().unwrap();
        assert_eq!(loaded.read().password, "hunter2");
        assert_eq!(sink.store_count(), 1);
        assert!(!sink.peek("Account").unwrap().contains("hunter2"));
    }

    #[test]
    fn test_bypassed_load_leaves_cache_alone() {
        let plaintext = JsonSerializer.serialize(&account()).unwrap();
        let sink = Arc::new(MemorySink::with_entry("Account", plaintext));
        let cache: Arc<dyn SettingsCache> = Arc::new(StrongCache::new());
        let s = cached_store(Arc::clone(&sink), Arc::clone(&cache));

        let loaded = s
            .load_with::<Account>(LoadOptions::new().with_bypass_cache(true))
            .unwrap();
        assert_eq!(loaded.origin, LoadOrigin::Storage);
        assert_eq!(sink.store_count(), 1);
        assert!(!sink.peek("Account").unwrap().contains("hunter2"));
        assert!(cache.try_get::<Account>().is_none());
    }

    #[test]
    fn test_loaded_hook_sees_plaintext_once() {
        let sink = Arc::new(MemorySink::new());
        let s = cached_store(Arc::clone(&sink), Arc::new(StrongCache::new()));
        s.persist(
            &Observed {
                secret: "hunter2".into(),
                seen: Vec::new(),
            },
            SaveOptions::default(),
        )
        .unwrap();
        assert!(!sink.peek("Observed").unwrap().contains("hunter2"));

        let first = s.load::<Observed>().unwrap();
        let second = s.load_with::<Observed>(LoadOptions::default()).unwrap();
        assert_eq!(second.origin, LoadOrigin::Cache);
        assert_eq!(first.read().seen, vec!["hunter2".to_string()]);
    }

    #[test]
    fn test_wrong_key_is_decrypt_error() {
        let sink = Arc::new(MemorySink::new());
        store(Arc::clone(&sink))
            .save(&handle(account()))
            .unwrap();

        let other = EncryptedStore::with_codec(
            SettingsManager::new(sink, Arc::new(JsonSerializer), Arc::new(NoCache)),
            EncryptionCodec::new(AesGcmCipher::from_passphrase("other").unwrap()),
        );
        assert!(matches!(
            other.load::<Account>(),
            Err(LoadError::Decrypt { key: "Account", .. })
        ));
    }
}
