//! Per-type settings caches.
//!
//! Caches are keyed by the settings type, so each type has at most one
//! cached instance. The object-safe [`SettingsCache`] works on type-erased
//! handles; [`CacheExt`] adds the typed operations used by callers.
//!
//! - [`StrongCache`] keeps instances alive until removed.
//! - [`WeakCache`] holds non-owning references; an entry dies with the
//!   last [`Handle`] held elsewhere.
//! - [`NoCache`] never caches.

use crate::settings::{Handle, Settings};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};

/// A settings handle with its type erased.
pub type ErasedHandle = Arc<dyn Any + Send + Sync>;

/// Type-erased cache storage.
pub trait SettingsCache: Send + Sync {
    fn get(&self, key: TypeId) -> Option<ErasedHandle>;

    fn insert(&self, key: TypeId, value: ErasedHandle);

    /// Return the cached value or install the factory's result. The flag is
    /// `true` when the value came from the cache. The factory must not call
    /// back into the cache.
    fn get_or_insert_with(&self, key: TypeId, factory: &mut dyn FnMut() -> ErasedHandle) -> (bool, ErasedHandle);

    fn remove(&self, key: TypeId) -> Option<ErasedHandle>;

    /// Every live cached value.
    fn values(&self) -> Vec<ErasedHandle>;
}

/// Typed cache operations.
pub trait CacheExt {
    fn try_get<T: Settings>(&self) -> Option<Handle<T>>;

    fn add_or_update<T: Settings>(&self, settings: Handle<T>);

    fn try_get_or_add<T: Settings>(&self, factory: impl FnOnce() -> T) -> (bool, Handle<T>);

    /// Install `settings` unless an instance is already cached. Returns the
    /// instance the cache now answers with, flagged `true` when it was the
    /// existing one.
    fn get_or_add<T: Settings>(&self, settings: Handle<T>) -> (bool, Handle<T>);

    fn try_remove<T: Settings>(&self) -> Option<Handle<T>>;

    fn get_all(&self) -> Vec<ErasedHandle>;
}

fn downcast<T: Settings>(erased: ErasedHandle) -> Option<Handle<T>> {
    erased.downcast::<RwLock<T>>().ok()
}

impl<C: SettingsCache + ?Sized> CacheExt for C {
    fn try_get<T: Settings>(&self) -> Option<Handle<T>> {
        self.get(TypeId::of::<T>()).and_then(downcast::<T>)
    }

    fn add_or_update<T: Settings>(&self, settings: Handle<T>) {
        self.insert(TypeId::of::<T>(), settings);
    }

    fn try_get_or_add<T: Settings>(&self, factory: impl FnOnce() -> T) -> (bool, Handle<T>) {
        let mut factory = Some(factory);
        let mut created: Option<Handle<T>> = None;
        let (hit, erased) = self.get_or_insert_with(TypeId::of::<T>(), &mut || {
            let handle = crate::settings::handle(factory.take().map(|f| f()).unwrap_or_default());
            created = Some(Arc::clone(&handle));
            let erased: ErasedHandle = handle;
            erased
        });
        match downcast::<T>(erased) {
            Some(handle) => (hit, handle),
            // TypeId keys make a mismatch impossible; fall back to the fresh instance
            None => (false, created.unwrap_or_else(|| crate::settings::handle(T::default()))),
        }
    }

    fn get_or_add<T: Settings>(&self, settings: Handle<T>) -> (bool, Handle<T>) {
        let erased: ErasedHandle = settings.clone();
        let (hit, cached) = self.get_or_insert_with(TypeId::of::<T>(), &mut || Arc::clone(&erased));
        match downcast::<T>(cached) {
            Some(handle) => (hit, handle),
            None => (false, settings),
        }
    }

    fn try_remove<T: Settings>(&self) -> Option<Handle<T>> {
        self.remove(TypeId::of::<T>()).and_then(downcast::<T>)
    }

    fn get_all(&self) -> Vec<ErasedHandle> {
        self.values()
    }
}

/// Cache that holds strong references until removed.
#[derive(Default)]
pub struct StrongCache {
    entries: DashMap<TypeId, ErasedHandle>,
}

impl StrongCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsCache for StrongCache {
    fn get(&self, key: TypeId) -> Option<ErasedHandle> {
        self.entries.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    fn insert(&self, key: TypeId, value: ErasedHandle) {
        self.entries.insert(key, value);
    }

    fn get_or_insert_with(&self, key: TypeId, factory: &mut dyn FnMut() -> ErasedHandle) -> (bool, ErasedHandle) {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => (true, Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let value = factory();
                entry.insert(Arc::clone(&value));
                (false, value)
            }
        }
    }

    fn remove(&self, key: TypeId) -> Option<ErasedHandle> {
        self.entries.remove(&key).map(|(_, value)| value)
    }

    fn values(&self) -> Vec<ErasedHandle> {
        self.entries.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}

/// Cache of non-owning references.
#[derive(Default)]
pub struct WeakCache {
    entries: DashMap<TypeId, Weak<dyn Any + Send + Sync>>,
}

impl WeakCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsCache for WeakCache {
    fn get(&self, key: TypeId) -> Option<ErasedHandle> {
        self.entries.get(&key).and_then(|entry| entry.value().upgrade())
    }

    fn insert(&self, key: TypeId, value: ErasedHandle) {
        self.entries.insert(key, Arc::downgrade(&value));
    }

    fn get_or_insert_with(&self, key: TypeId, factory: &mut dyn FnMut() -> ErasedHandle) -> (bool, ErasedHandle) {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(live) = entry.get().upgrade() {
                    return (true, live);
                }
                let value = factory();
                entry.insert(Arc::downgrade(&value));
                (false, value)
            }
            Entry::Vacant(entry) => {
                let value = factory();
                entry.insert(Arc::downgrade(&value));
                (false, value)
            }
        }
    }

    fn remove(&self, key: TypeId) -> Option<ErasedHandle> {
        self.entries.remove(&key).and_then(|(_, weak)| weak.upgrade())
    }

    fn values(&self) -> Vec<ErasedHandle> {
        self.entries.iter().filter_map(|entry| entry.value().upgrade()).collect()
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl SettingsCache for NoCache {
    fn get(&self, _key: TypeId) -> Option<ErasedHandle> {
        None
    }

    fn insert(&self, _key: TypeId, _value: ErasedHandle) {}

    fn get_or_insert_with(&self, _key: TypeId, factory: &mut dyn FnMut() -> ErasedHandle) -> (bool, ErasedHandle) {
        (false, factory())
    }

    fn remove(&self, _key: TypeId) -> Option<ErasedHandle> {
        None
    }

    fn values(&self) -> Vec<ErasedHandle> {
        Vec::new()
    }
}

/// Cache behavior selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    #[default]
    Strong,
    Weak,
    None,
}

impl CachePolicy {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strong" => Some(CachePolicy::Strong),
            "weak" => Some(CachePolicy::Weak),
            "none" | "off" => Some(CachePolicy::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::Strong => "strong",
            CachePolicy::Weak => "weak",
            CachePolicy::None => "none",
        }
    }

    pub fn build(&self) -> Arc<dyn SettingsCache> {
        match self {
            CachePolicy::Strong => Arc::new(StrongCache::new()),
            CachePolicy::Weak => Arc::new(WeakCache::new()),
            CachePolicy::None => Arc::new(NoCache),
        }
    }
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
