//! Atom: a serialized mutable cell with observers
//!
//! An `Atom<M>` owns one model value. Every read and write of the value, and
//! every change to the observer registry, runs as a job on the atom's private
//! serial executor, so they share one FIFO order and never overlap.
//!
//! Observers are called with snapshots on the general-purpose executor, never
//! on the serial one, so an observer may call `update` without deadlocking.
//! Results of `update`/`read` are also handed back on the general-purpose
//! executor so that chained work does not occupy the serial executor.

use crate::async_op::Async;
use crate::config::Executors;
use crate::errors::Result;
use crate::executor::ExecutorRef;
use crate::outcome::{catch_panic, lock};
use hashbrown::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Callback receiving model snapshots
pub type Observer<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Token identifying a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Atom
// ----------------------------------------------------------------------------

struct AtomState<M> {
    value: M,
    observers: HashMap<ObserverId, Observer<M>>,
}

struct AtomInner<M> {
    serial: ExecutorRef,
    general: ExecutorRef,
    // Only locked from jobs on `serial`; the mutex makes the sharing explicit.
    state: Mutex<AtomState<M>>,
}

/// Exclusively-owned model value with serialized access and change broadcast
pub struct Atom<M> {
    inner: Arc<AtomInner<M>>,
}

impl<M> Clone for Atom<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M> fmt::Debug for Atom<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("serial", &self.inner.serial.label())
            .field("general", &self.inner.general.label())
            .finish_non_exhaustive()
    }
}

impl<M: Clone + Send + 'static> Atom<M> {
    pub fn new(initial: M, executors: &Executors) -> Result<Self> {
        Self::with_label("cascade.atom", initial, executors)
    }

    /// Create an atom whose serial executor carries `label`
    pub fn with_label(label: &str, initial: M, executors: &Executors) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(AtomInner {
                serial: executors.serial(label)?,
                general: executors.general().clone(),
                state: Mutex::new(AtomState {
                    value: initial,
                    observers: HashMap::new(),
                }),
            }),
        })
    }

    /// Mutate the model in place.
    ///
    /// `modify` runs on the serial executor with exclusive access. When it
    /// succeeds, every registered observer is sent the new snapshot. A failure
    /// (or panic) is delivered to the caller and no observer is notified. The
    /// returned computation is lazy: nothing is scheduled until it is run.
    pub fn update<A, F>(&self, modify: F) -> Async<A>
    where
        A: Send + 'static,
        F: Fn(&mut M) -> Result<A> + Send + Sync + 'static,
    {
        let inner = self.inner.clone();
        let modify = Arc::new(modify);
        Async::spawn(&self.inner.serial, move || inner.modify(&*modify))
            .transferred(&self.inner.general)
    }

    /// Read the model on the serial executor without notifying observers
    pub fn read<A, F>(&self, inspect: F) -> Async<A>
    where
        A: Send + 'static,
        F: Fn(&M) -> A + Send + Sync + 'static,
    {
        let inner = self.inner.clone();
        Async::spawn(&self.inner.serial, move || {
            Ok(inspect(&lock(&inner.state).value))
        })
        .transferred(&self.inner.general)
    }

    /// Current model value
    pub fn snapshot(&self) -> Async<M> {
        self.read(M::clone)
    }

    /// Number of registered observers, as seen from the serial executor
    pub fn observer_count(&self) -> Async<usize> {
        let inner = self.inner.clone();
        Async::spawn(&self.inner.serial, move || Ok(lock(&inner.state).observers.len()))
            .transferred(&self.inner.general)
    }

    /// Register `observer` and immediately send it the current snapshot.
    ///
    /// Registration happens asynchronously on the serial executor; the
    /// snapshot is taken in the same job, so it reflects every update queued
    /// before this call.
    pub fn notify<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        let id = ObserverId::generate();
        let observer: Observer<M> = Arc::new(observer);
        let inner = self.inner.clone();
        self.inner.serial.execute(Box::new(move || {
            let snapshot = {
                let mut state = lock(&inner.state);
                state.observers.insert(id, observer.clone());
                state.value.clone()
            };
            inner.broadcast(std::iter::once(observer), snapshot);
        }));
        id
    }

    /// Unregister an observer.
    ///
    /// Sends already handed to the general-purpose executor may still arrive.
    pub fn remove_observer(&self, id: ObserverId) {
        let inner = self.inner.clone();
        self.inner.serial.execute(Box::new(move || {
            lock(&inner.state).observers.remove(&id);
        }));
    }
}

impl<M: Clone + Send + 'static> AtomInner<M> {
    fn modify<A>(&self, modify: &(dyn Fn(&mut M) -> Result<A> + Send + Sync)) -> Result<A> {
        let (outcome, snapshot, observers) = {
            let mut state = lock(&self.state);
            let outcome = catch_panic(|| modify(&mut state.value));
            if outcome.is_err() || state.observers.is_empty() {
                return outcome;
            }
            let observers: Vec<Observer<M>> = state.observers.values().cloned().collect();
            (outcome, state.value.clone(), observers)
        };
        self.broadcast(observers, snapshot);
        outcome
    }

    fn broadcast<I>(&self, observers: I, snapshot: M)
    where
        I: IntoIterator<Item = Observer<M>>,
    {
        for observer in observers {
            let snapshot = snapshot.clone();
            self.general.execute(Box::new(move || observer(snapshot)));
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
