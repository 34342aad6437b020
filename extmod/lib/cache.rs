//! Process-lifetime storage of loaded modules, keyed by source URL.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A store of modules that have already been loaded, keyed by the URL they were loaded from.
///
/// Both operations are synchronous so a consumer can decide between the cached and the pending
/// path before any asynchronous work starts.
pub trait ModuleCache<T>: Send + Sync {
    /// Returns the module previously stored for `url`, if any. Never has side effects.
    fn lookup(&self, url: &str) -> Option<Arc<T>>;

    /// Stores `module` under `url`, replacing whatever was there before.
    fn store(&self, url: &str, module: Arc<T>);
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An in-memory [`ModuleCache`].
///
/// Clones share the same underlying map, so one instance created at the application root can be
/// handed to every loader that should see the same modules. Entries are never evicted.
pub struct MemoryModuleCache<T> {
    entries: Arc<RwLock<HashMap<String, Arc<T>>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T> MemoryModuleCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The number of cached modules.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The URLs currently cached, in no particular order.
    pub fn urls(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T> ModuleCache<T> for MemoryModuleCache<T>
where
    T: Send + Sync,
{
    fn lookup(&self, url: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn store(&self, url: &str, module: Arc<T>) {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), module);

        if previous.is_some() {
            tracing::debug!(url, "replaced cached module");
        }
    }
}

impl<T> Clone for MemoryModuleCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for MemoryModuleCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemoryModuleCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryModuleCache")
            .field("urls", &self.urls())
            .finish()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
