//! Load/save orchestration.
//!
//! [`SettingsManager`] decides per load whether to answer from the cache,
//! create a default instance, or deserialize stored data, and whether the
//! stored data must be rewritten because it no longer matches what the
//! current type would serialize to.

use crate::cache::{CacheExt, SettingsCache};
use crate::error::{DeleteError, LoadError, SaveError};
use crate::format::{SerializerExt, SettingsSerializer};
use crate::settings::{Handle, Settings, handle};
use crate::storage::SettingsSink;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Options for a single load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail with [`LoadError::Unavailable`] instead of creating a default.
    pub prevent_creation: bool,
    /// Never write during the load: no default persistence, no drift rewrite.
    pub prevent_update: bool,
    /// Ignore the cache for both lookup and update.
    pub bypass_cache: bool,
    /// Skip [`Settings::loaded`]. A wrapping store sets this and fires the
    /// hook itself once the instance is final.
    pub defer_loaded: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prevent_creation(mut self, prevent: bool) -> Self {
        self.prevent_creation = prevent;
        self
    }

    pub fn with_prevent_update(mut self, prevent: bool) -> Self {
        self.prevent_update = prevent;
        self
    }

    pub fn with_bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    pub fn with_defer_loaded(mut self, defer: bool) -> Self {
        self.defer_loaded = defer;
        self
    }
}

/// Options for a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Keep a copy of the previously stored data.
    pub backup: bool,
    /// Persist only; leave the cache untouched.
    pub skip_cache: bool,
}

impl SaveOptions {
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }
}

/// Options for a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Keep a copy of the purged data.
    pub backup: bool,
}

impl DeleteOptions {
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }
}

/// Where a loaded instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Returned from the cache without touching storage.
    Cache,
    /// Deserialized from stored data.
    Storage,
    /// Constructed with `Default` because nothing was stored.
    Created,
}

/// A loaded settings handle with its origin.
#[derive(Debug)]
pub struct Loaded<T> {
    pub handle: Handle<T>,
    pub origin: LoadOrigin,
}

impl<T> Loaded<T> {
    pub fn into_handle(self) -> Handle<T> {
        self.handle
    }
}

/// The settings persistence contract shared by the manager and its wrappers.
pub trait SettingsStore: Send + Sync {
    fn load_with<T: Settings>(&self, options: LoadOptions) -> Result<Loaded<T>, LoadError>;

    /// Serialize and store `settings` without touching the cache.
    fn persist<T: Settings>(&self, settings: &T, options: SaveOptions) -> Result<(), SaveError>;

    fn delete_with<T: Settings>(&self, options: DeleteOptions) -> Result<(), DeleteError>;

    /// The cache that loads answer from and saves update.
    fn cache(&self) -> &Arc<dyn SettingsCache>;

    /// Persist the instance behind `settings`, then make that handle the
    /// cached one unless `options.skip_cache` is set.
    fn save_with<T: Settings>(&self, settings: &Handle<T>, options: SaveOptions) -> Result<(), SaveError> {
        self.persist(&*settings.read(), options)?;
        if !options.skip_cache {
            self.cache().add_or_update(Arc::clone(settings));
        }
        Ok(())
    }

    fn load<T: Settings>(&self) -> Result<Handle<T>, LoadError> {
        Ok(self.load_with::<T>(LoadOptions::default())?.into_handle())
    }

    fn save<T: Settings>(&self, settings: &Handle<T>) -> Result<(), SaveError> {
        self.save_with(settings, SaveOptions::default())
    }

    fn delete<T: Settings>(&self) -> Result<(), DeleteError> {
        self.delete_with::<T>(DeleteOptions::default())
    }
}

/// Orchestrates cache, sink and serializer for typed settings.
///
/// All operations of one manager run one at a time. The sink, serializer
/// and cache are shared and may be used by other managers too.
pub struct SettingsManager {
    sink: Arc<dyn SettingsSink>,
    serializer: Arc<dyn SettingsSerializer>,
    cache: Arc<dyn SettingsCache>,
    lock: Mutex<()>,
}

impl SettingsManager {
    pub fn new(
        sink: Arc<dyn SettingsSink>,
        serializer: Arc<dyn SettingsSerializer>,
        cache: Arc<dyn SettingsCache>,
    ) -> Self {
        Self {
            sink,
            serializer,
            cache,
            lock: Mutex::new(()),
        }
    }

    pub fn sink(&self) -> &Arc<dyn SettingsSink> {
        &self.sink
    }

    pub fn serializer(&self) -> &Arc<dyn SettingsSerializer> {
        &self.serializer
    }

    /// Serialize and store without taking the lock.
    fn store_unlocked<T: Settings>(&self, settings: &T, backup: bool) -> Result<(), SaveError> {
        let key = T::key();
        let data = self
            .serializer
            .serialize(settings)
            .map_err(|source| SaveError::Serialize { key, source })?;
        self.sink
            .store(key, &data, backup)
            .map_err(|source| SaveError::Store { key, source })?;
        debug!(key, backup, "stored settings");
        Ok(())
    }

    fn read_stored<T: Settings>(&self, options: LoadOptions) -> Result<(T, LoadOrigin), LoadError> {
        let key = T::key();
        let data = self
            .sink
            .retrieve(key)
            .map_err(|source| LoadError::Retrieve { key, source })?;

        let Some(data) = data else {
            if options.prevent_creation {
                return Err(LoadError::Unavailable { key });
            }
            info!(key, "no stored settings, creating defaults");
            let settings = T::default();
            if !options.prevent_update {
                self.store_unlocked(&settings, false)?;
            }
            return Ok((settings, LoadOrigin::Created));
        };

        let (mut settings, raw) = self
            .serializer
            .deserialize::<T>(&data, T::OBSERVES_LAYOUT_CHANGES)
            .map_err(|source| LoadError::Deserialize { key, source })?;

        if !options.prevent_update {
            let identical = self
                .serializer
                .matches_stored(&settings, &data)
                .map_err(|source| LoadError::Compare { key, source })?;
            if !identical {
                info!(key, "stored settings differ from current layout, rewriting with backup");
                if let Some(raw) = raw.as_ref() {
                    settings.layout_changed(raw);
                }
                self.store_unlocked(&settings, true)?;
            }
        }

        Ok((settings, LoadOrigin::Storage))
    }
}

impl SettingsStore for SettingsManager {
    fn load_with<T: Settings>(&self, options: LoadOptions) -> Result<Loaded<T>, LoadError> {
        let _guard = self.lock.lock();

        if !options.bypass_cache {
            if let Some(cached) = self.cache.try_get::<T>() {
                debug!(key = T::key(), "settings cache hit");
                return Ok(Loaded {
                    handle: cached,
                    origin: LoadOrigin::Cache,
                });
            }
        }

        let (mut settings, origin) = self.read_stored::<T>(options)?;
        if !options.defer_loaded {
            settings.loaded();
        }
        let shared = handle(settings);
        if !options.bypass_cache {
            self.cache.add_or_update(Arc::clone(&shared));
        }

        Ok(Loaded {
            handle: shared,
            origin,
        })
    }

    fn persist<T: Settings>(&self, settings: &T, options: SaveOptions) -> Result<(), SaveError> {
        let _guard = self.lock.lock();
        self.store_unlocked(settings, options.backup)
    }

    fn delete_with<T: Settings>(&self, options: DeleteOptions) -> Result<(), DeleteError> {
        let _guard = self.lock.lock();
        let key = T::key();
        self.sink
            .purge(key, options.backup)
            .map_err(|source| DeleteError { key, source })?;
        self.cache.try_remove::<T>();
        debug!(key, "deleted settings");
        Ok(())
    }

    fn cache(&self) -> &Arc<dyn SettingsCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoCache, StrongCache};
    use crate::format::JsonSerializer;
    use crate::storage::MemorySink;
    use crate::traverse::Traverse;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        #[serde(skip)]
        loads: u32,
    }
    impl Traverse for Prefs {}
    impl Settings for Prefs {
        fn loaded(&mut self) {
            self.loads += 1;
        }
    }

    fn manager(sink: Arc<MemorySink>, cache: Arc<dyn SettingsCache>) -> SettingsManager {
        SettingsManager::new(sink, Arc::new(JsonSerializer), cache)
    }

    #[test]
    fn test_missing_data_creates_and_stores_default() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(NoCache));
        let loaded = m.load_with::<Prefs>(LoadOptions::default()).unwrap();
        assert_eq!(loaded.origin, LoadOrigin::Created);
        assert_eq!(sink.store_count(), 1);
        assert!(sink.peek("Prefs").is_some());
    }

    #[test]
    fn test_prevent_creation_fails_without_storing() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(NoCache));
        let err = m
            .load_with::<Prefs>(LoadOptions::new().with_prevent_creation(true))
            .unwrap_err();
        assert!(matches!(err, LoadError::Unavailable { key: "Prefs" }));
        assert_eq!(sink.store_count(), 0);
    }

    #[test]
    fn test_prevent_update_does_not_persist_default() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(NoCache));
        m.load_with::<Prefs>(LoadOptions::new().with_prevent_update(true)).unwrap();
        assert_eq!(sink.store_count(), 0);
    }

    #[test]
    fn test_cache_hit_skips_sink_and_notification() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(StrongCache::new()));
        let first = m.load::<Prefs>().unwrap();
        let second = m.load_with::<Prefs>(LoadOptions::default()).unwrap();
        assert_eq!(second.origin, LoadOrigin::Cache);
        assert!(Arc::ptr_eq(&first, &second.handle));
        assert_eq!(sink.retrieve_count(), 1);
        assert_eq!(first.read().loads, 1);
    }

    #[test]
    fn test_bypass_cache_reads_storage() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(StrongCache::new()));
        let first = m.load::<Prefs>().unwrap();
        let again = m
            .load_with::<Prefs>(LoadOptions::new().with_bypass_cache(true))
            .unwrap();
        assert_eq!(again.origin, LoadOrigin::Storage);
        assert!(!Arc::ptr_eq(&first, &again.handle));
        assert_eq!(sink.retrieve_count(), 2);
    }

    #[test]
    fn test_save_then_delete() {
        let sink = Arc::new(MemorySink::new());
        let cache: Arc<dyn SettingsCache> = Arc::new(StrongCache::new());
        let m = manager(Arc::clone(&sink), Arc::clone(&cache));
        let prefs = handle(Prefs {
            theme: "dark".into(),
            loads: 0,
        });
        m.save_with(&prefs, SaveOptions::default().with_backup(true)).unwrap();
        assert!(sink.peek("Prefs").unwrap().contains("dark"));
        assert!(cache.try_get::<Prefs>().is_some());

        m.delete::<Prefs>().unwrap();
        assert!(sink.peek("Prefs").is_none());
        assert!(cache.try_get::<Prefs>().is_none());
    }

    #[test]
    fn test_save_can_skip_cache() {
        let sink = Arc::new(MemorySink::new());
        let cache: Arc<dyn SettingsCache> = Arc::new(StrongCache::new());
        let m = manager(Arc::clone(&sink), Arc::clone(&cache));
        m.save_with(&handle(Prefs::default()), SaveOptions::default().with_skip_cache(true))
            .unwrap();
        assert_eq!(sink.store_count(), 1);
        assert!(cache.try_get::<Prefs>().is_none());
    }

    #[test]
    fn test_deferred_load_skips_notification() {
        let sink = Arc::new(MemorySink::new());
        let m = manager(Arc::clone(&sink), Arc::new(NoCache));
        let loaded = m
            .load_with::<Prefs>(LoadOptions::new().with_defer_loaded(true))
            .unwrap();
        assert_eq!(loaded.handle.read().loads, 0);
        assert_eq!(m.load::<Prefs>().unwrap().read().loads, 1);
    }
}
