//! Lookaside cache of resolved article image URLs.
//!
//! A `None` value is a negative entry: the article was fetched and has no
//! usable main image. Entries are never evicted.
//!
//! Filling is not single-flight. Two concurrent misses for the same identifier
//! both fetch; the first insert is kept and the second is discarded, which is
//! harmless because both compute the same answer.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct ImageUrlCache {
    entries: RwLock<HashMap<String, Option<String>>>,
}

impl ImageUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on a miss, `Some(None)` on a cached negative entry.
    pub fn get(&self, id: &str) -> Option<Option<String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).contains_key(id)
    }

    /// Stores `image_url` unless the slot is already filled, and returns the
    /// value that ends up cached.
    pub fn insert_if_absent(&self, id: &str, image_url: Option<String>) -> Option<String> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_insert(image_url)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, for inspection.
    pub fn snapshot(&self) -> HashMap<String, Option<String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
