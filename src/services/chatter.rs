//! Chatter table — per-identity display name and color.
//!
//! Entries are created lazily on first submit and never removed. The table
//! has its own lock, independent of the message log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::command::escape_html;

pub const DEFAULT_COLOR: &str = "green";

/// Display state for one caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chatter {
    /// Opaque identity key (forwarded IP or peer address).
    pub key: String,
    pub name: String,
    pub color: String,
}

#[derive(Clone)]
pub struct ChatterTable {
    inner: Arc<Mutex<HashMap<String, Chatter>>>,
    default_color: Arc<str>,
}

impl ChatterTable {
    #[must_use]
    pub fn new(default_color: impl Into<String>) -> Self {
        let default_color: String = default_color.into();
        Self { inner: Arc::new(Mutex::new(HashMap::new())), default_color: default_color.into() }
    }

    /// Look up `key`, creating a chatter named after the (escaped) key if absent.
    /// Returns a copy; later updates go through `set_name`/`set_color`.
    pub fn resolve(&self, key: &str) -> Chatter {
        let mut chatters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        chatters
            .entry(key.to_owned())
            .or_insert_with(|| self.fresh(key))
            .clone()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Chatter> {
        let chatters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        chatters.get(key).cloned()
    }

    pub fn set_name(&self, key: &str, name: String) {
        self.update(key, |chatter| chatter.name = name);
    }

    pub fn set_color(&self, key: &str, color: String) {
        self.update(key, |chatter| chatter.color = color);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, key: &str, apply: impl FnOnce(&mut Chatter)) {
        let mut chatters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let chatter = chatters.entry(key.to_owned()).or_insert_with(|| self.fresh(key));
        apply(chatter);
    }

    fn fresh(&self, key: &str) -> Chatter {
        Chatter { key: key.to_owned(), name: escape_html(key), color: self.default_color.to_string() }
    }
}

impl Default for ChatterTable {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

#[cfg(test)]
#[path = "chatter_test.rs"]
mod tests;
