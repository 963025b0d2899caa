//! Get-or-compute-once cells
//!
//! Each cell holds a deferred computation and its result. The first `get`
//! runs the computation under the cell's own lock, so concurrent first
//! accesses evaluate it once. Errors are returned but not stored: the next
//! `get` tries again.

use hcpdata_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

type Init<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

pub struct LazyCell<T> {
    slot: Mutex<Option<Arc<T>>>,
    init: Init<T>,
}

impl<T> LazyCell<T> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            slot: Mutex::new(None),
            init: Box::new(init),
        }
    }

    pub fn get(&self) -> Result<Arc<T>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::configuration("lazy cell lock poisoned"))?;
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = (self.init)()?;
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl<T> fmt::Debug for LazyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCell")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Keyed once-slots: one lock per key, so unrelated keys never wait on each other
pub struct OnceMap<K, V> {
    slots: Mutex<HashMap<K, Arc<Mutex<Option<Arc<V>>>>>>,
}

impl<K: Eq + Hash + Clone, V> OnceMap<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, computing it with `init` on first use
    pub fn get_or_try_init<F>(&self, key: &K, init: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| Error::configuration("cache lock poisoned"))?;
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut value = slot
            .lock()
            .map_err(|_| Error::configuration("cache slot lock poisoned"))?;
        if let Some(v) = value.as_ref() {
            return Ok(Arc::clone(v));
        }
        let computed = Arc::new(init()?);
        *value = Some(Arc::clone(&computed));
        Ok(computed)
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| {
                slots
                    .values()
                    .filter(|slot| slot.lock().map(|v| v.is_some()).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V> Default for OnceMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
