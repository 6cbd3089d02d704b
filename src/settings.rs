//! The settings contract and shared handles.

use crate::traverse::Traverse;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Shared, lockable settings instance returned by a load.
pub type Handle<T> = Arc<RwLock<T>>;

/// Wrap an owned instance into a [`Handle`].
pub fn handle<T>(settings: T) -> Handle<T> {
    Arc::new(RwLock::new(settings))
}

/// A strongly-typed settings object.
///
/// Only `Default` is required structurally; the notification hooks are
/// opt-in and do nothing unless overridden.
pub trait Settings: Traverse + Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Whether [`layout_changed`](Self::layout_changed) should receive the
    /// raw stored document when drift is detected.
    const OBSERVES_LAYOUT_CHANGES: bool = false;

    /// Storage key for this type. Defaults to the unqualified type name
    /// without generic arguments, so every instantiation of a generic type
    /// shares one key unless it is overridden.
    fn key() -> &'static str {
        let name = std::any::type_name::<Self>();
        let base = name.split('<').next().unwrap_or(name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Called once after a real load (never on a cache hit).
    fn loaded(&mut self) {}

    /// Called with the raw stored document before a drifted instance is
    /// written back. Only fires when `OBSERVES_LAYOUT_CHANGES` is set.
    fn layout_changed(&mut self, _raw: &serde_json::Value) {}
}
