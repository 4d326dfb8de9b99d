//! In-memory cache tier
//!
//! Entries live in an `Atom`, so concurrent loads and writes through one
//! loader are serialized on the atom's private executor.

use crate::loader::ResourceLoader;
use cascade_core::{Async, Atom, CascadeError, Executors, Result};
use hashbrown::HashMap;

/// URL-keyed value store behind a `ResourceLoader`
#[derive(Debug, Clone)]
pub struct MemoryCache<T> {
    entries: Atom<HashMap<String, T>>,
}

impl<T: Clone + Send + Sync + 'static> MemoryCache<T> {
    pub fn new(executors: &Executors) -> Result<Self> {
        Ok(Self {
            entries: Atom::with_label("cascade.memory-cache", HashMap::new(), executors)?,
        })
    }

    /// Loader view: a miss is `Err(CacheMiss)`, `set` always succeeds
    pub fn loader(&self) -> ResourceLoader<T> {
        let reader = self.clone();
        let writer = self.clone();
        ResourceLoader::new(
            move |resource| {
                let url = resource.url().to_string();
                reader.get(resource.url()).try_map(move |hit| {
                    hit.ok_or_else(|| CascadeError::cache_miss(url.as_str()))
                })
            },
            move |resource, value| writer.insert(resource.url(), value),
        )
    }

    pub fn get(&self, url: &str) -> Async<Option<T>> {
        let url = url.to_string();
        self.entries.read(move |entries| entries.get(&url).cloned())
    }

    pub fn insert(&self, url: &str, value: T) -> Async<()> {
        let url = url.to_string();
        self.entries.update(move |entries| {
            entries.insert(url.clone(), value.clone());
            Ok(())
        })
    }

    pub fn len(&self) -> Async<usize> {
        self.entries.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> Async<bool> {
        self.entries.read(|entries| entries.is_empty())
    }

    pub fn clear(&self) -> Async<()> {
        self.entries.update(|entries| {
            entries.clear();
            Ok(())
        })
    }
}
