//! ResourceLoader: a composable load/set policy
//!
//! A loader is a pair of operations over a `Resource<T>`. `combine` chains two
//! loaders into a fallback: the primary is asked first, and a value found in
//! the secondary is written back into the primary before it is returned. With
//! the identity loader as unit, loaders form a monoid, so a memory, disk and
//! network chain is `combine_all([memory, disk, network])`.

use crate::combinable::Combinable;
use crate::config::LoaderConfig;
use crate::disk::DiskCache;
use crate::fetch::Fetcher;
use crate::memory::MemoryCache;
use crate::resource::Resource;
use cascade_core::{Async, CascadeError, Executors, Result, Yield};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type LoadFn<T> = dyn Fn(&Resource<T>) -> Async<T> + Send + Sync;
type SetFn<T> = dyn Fn(&Resource<T>, T) -> Async<()> + Send + Sync;

/// Pair of `load` and `set` operations over resources of type `T`
pub struct ResourceLoader<T> {
    load: Arc<LoadFn<T>>,
    set: Arc<SetFn<T>>,
}

impl<T> Clone for ResourceLoader<T> {
    fn clone(&self) -> Self {
        Self {
            load: self.load.clone(),
            set: self.set.clone(),
        }
    }
}

impl<T> fmt::Debug for ResourceLoader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> ResourceLoader<T> {
    pub fn new<L, S>(load: L, set: S) -> Self
    where
        L: Fn(&Resource<T>) -> Async<T> + Send + Sync + 'static,
        S: Fn(&Resource<T>, T) -> Async<()> + Send + Sync + 'static,
    {
        Self {
            load: Arc::new(load),
            set: Arc::new(set),
        }
    }

    pub fn load(&self, resource: &Resource<T>) -> Async<T> {
        (self.load)(resource)
    }

    pub fn set(&self, resource: &Resource<T>, value: T) -> Async<()> {
        (self.set)(resource, value)
    }

    /// Loader that never has a value and accepts every write
    pub fn fail() -> Self {
        Self::new(
            |_| Async::fail(CascadeError::NoLoader),
            |_, _| Async::pure(()),
        )
    }

    /// Fall back to `secondary` when this loader fails
    pub fn or(&self, secondary: &Self) -> Self {
        self.combine(secondary)
    }

    /// Loader backed by a `Fetcher`; decoding uses the resource's decoder
    /// and `set` is a successful no-op.
    pub fn network(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(
            move |resource| {
                let resource = resource.clone();
                fetcher
                    .fetch(resource.request())
                    .try_map(move |bytes| resource.decode(&bytes))
            },
            |_, _| Async::pure(()),
        )
    }

    /// In-memory tier keyed by URL
    pub fn memory(executors: &Executors) -> Result<Self> {
        Ok(MemoryCache::new(executors)?.loader())
    }
}

impl<T: Clone + Send + Sync + 'static> Combinable for ResourceLoader<T> {
    fn identity() -> Self {
        Self::fail()
    }

    fn combine(&self, secondary: &Self) -> Self {
        let primary = self.clone();
        let secondary_for_load = secondary.clone();
        let load = move |resource: &Resource<T>| {
            let primary = primary.clone();
            let secondary = secondary_for_load.clone();
            let resource = resource.clone();
            Async::new(move |deliver: Yield<T>| {
                fall_through(&primary, &secondary, &resource, deliver)
            })
        };

        let primary = self.clone();
        let secondary = secondary.clone();
        let set = move |resource: &Resource<T>, value: T| {
            primary
                .set(resource, value.clone())
                .then(secondary.set(resource, value))
        };

        Self::new(load, set)
    }
}

/// Ask `primary`, then `secondary`, promoting a secondary hit into `primary`.
///
/// A failed promotion ends the chain as `WriteBack` and is never treated as a
/// miss by an enclosing chain. When both tiers miss, the reported error is the
/// secondary's unless it is `NoLoader`, in which case the primary's is kept.
fn fall_through<T: Clone + Send + Sync + 'static>(
    primary: &ResourceLoader<T>,
    secondary: &ResourceLoader<T>,
    resource: &Resource<T>,
    deliver: Yield<T>,
) {
    let write_target = primary.clone();
    let secondary = secondary.clone();
    let resource = resource.clone();
    primary.load(&resource).run(move |outcome| match outcome {
        Ok(value) => {
            trace!(url = resource.url(), "primary tier hit");
            deliver.send(Ok(value));
        }
        Err(primary_error) if primary_error.is_write_back() => {
            deliver.send(Err(primary_error));
        }
        Err(primary_error) => {
            trace!(url = resource.url(), error = %primary_error, "primary tier missed");
            secondary.load(&resource).run(move |outcome| match outcome {
                Ok(value) => {
                    debug!(url = resource.url(), "promoting value into primary tier");
                    write_target.set(&resource, value.clone()).run(move |written| {
                        deliver.send(written.map(|()| value).map_err(CascadeError::write_back))
                    });
                }
                Err(CascadeError::NoLoader) => deliver.send(Err(primary_error)),
                Err(secondary_error) => deliver.send(Err(secondary_error)),
            });
        }
    });
}

/// Memory, then disk when `config.cache_dir` is set, then `fetcher`
pub fn standard_chain<T>(
    config: &LoaderConfig,
    executors: &Executors,
    fetcher: Arc<dyn Fetcher>,
) -> Result<ResourceLoader<T>>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    config.validate()?;
    let mut tiers = Vec::new();
    if config.memory_cache {
        tiers.push(ResourceLoader::memory(executors)?);
    }
    if let Some(dir) = &config.cache_dir {
        tiers.push(DiskCache::open(dir, executors)?.loader());
    }
    tiers.push(ResourceLoader::network(fetcher));
    Ok(ResourceLoader::combine_all(tiers))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
