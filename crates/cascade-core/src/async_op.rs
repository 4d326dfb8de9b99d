//! Continuation-based asynchronous computations
//!
//! An `Async<T>` describes how to start some work and hand its single
//! `Result<T>` to a continuation. It is lazy and re-runnable: nothing happens
//! until `run` is called, and every call to `run` starts the work again.
//!
//! ## Delivery contract
//!
//! - Each `run` delivers exactly one result to its continuation. The
//!   continuation travels as a `Yield<T>`, which is consumed by `send`, so a
//!   second delivery does not type-check. A `Yield` dropped without being used
//!   delivers `CascadeError::Abandoned`.
//! - The thread a result arrives on depends only on how the value was built
//!   (`spawn` delivers on its executor, `pure` delivers inline) and on any
//!   later `transferred` call.
//! - Failures are forwarded untouched. Nothing here retries or logs.

use crate::errors::{CascadeError, Result};
use crate::executor::ExecutorRef;
use crate::join::JoinBarrier;
use crate::outcome::{catch_panic, ApplyExt, ResultExt};
use futures::channel::oneshot;
use futures::future::BoxFuture;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::runtime::Handle;

// ----------------------------------------------------------------------------
// Yield
// ----------------------------------------------------------------------------

type Continuation<T> = Box<dyn FnOnce(Result<T>) + Send>;

/// The single-use continuation handed to an operation
pub struct Yield<T> {
    continuation: Option<Continuation<T>>,
}

impl<T> Yield<T> {
    pub fn new<K>(continuation: K) -> Self
    where
        K: FnOnce(Result<T>) + Send + 'static,
    {
        Self {
            continuation: Some(Box::new(continuation)),
        }
    }

    /// Deliver the outcome, consuming the continuation
    pub fn send(mut self, outcome: Result<T>) {
        if let Some(continuation) = self.continuation.take() {
            continuation(outcome);
        }
    }
}

impl<T> Drop for Yield<T> {
    fn drop(&mut self) {
        if let Some(continuation) = self.continuation.take() {
            continuation(Err(CascadeError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Yield<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yield")
            .field("pending", &self.continuation.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Async
// ----------------------------------------------------------------------------

type Operation<T> = dyn Fn(Yield<T>) + Send + Sync;

/// A lazy, re-runnable asynchronous computation producing one `Result<T>`
pub struct Async<T> {
    operation: Arc<Operation<T>>,
}

impl<T> Clone for Async<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
        }
    }
}

impl<T> fmt::Debug for Async<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Async")
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Send + 'static> Async<T> {
    /// Wrap an operation that accepts a continuation
    pub fn new<F>(operation: F) -> Self
    where
        F: Fn(Yield<T>) + Send + Sync + 'static,
    {
        Self {
            operation: Arc::new(operation),
        }
    }

    /// Schedule `f` on `executor` and deliver its outcome there.
    ///
    /// A panic inside `f` is delivered as `CascadeError::Panicked`.
    pub fn spawn<F>(executor: &ExecutorRef, f: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let executor = executor.clone();
        let f = Arc::new(f);
        Self::new(move |deliver| {
            let f = f.clone();
            executor.execute(Box::new(move || deliver.send(catch_panic(|| f()))));
        })
    }

    /// Deliver `Ok(value)` inline, on whatever thread calls `run`
    pub fn pure(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move |deliver| deliver.send(Ok(value.clone())))
    }

    /// Deliver `Err(error)` inline
    pub fn fail(error: CascadeError) -> Self {
        Self::new(move |deliver| deliver.send(Err(error.clone())))
    }

    /// Turn a fallible function into one producing inline `Async` values
    pub fn lift<I, F>(f: F) -> impl Fn(I) -> Async<T>
    where
        I: Clone + Send + Sync + 'static,
        F: Fn(I) -> Result<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        move |input: I| {
            let f = f.clone();
            Async::new(move |deliver| {
                let input = input.clone();
                deliver.send(catch_panic(|| f(input)));
            })
        }
    }

    /// Bridge a future factory onto a tokio runtime.
    ///
    /// Each `run` calls `make` and spawns the resulting future on `handle`;
    /// the outcome is delivered on a runtime worker thread.
    pub fn from_future<F, Fut>(handle: Handle, make: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::new(move |deliver| {
            let future = make();
            drop(handle.spawn(async move {
                deliver.send(future.await);
            }));
        })
    }

    /// Start the computation, handing its result to `continuation`
    pub fn run<K>(&self, continuation: K)
    where
        K: FnOnce(Result<T>) + Send + 'static,
    {
        (self.operation)(Yield::new(continuation));
    }

    /// Start the computation with an existing `Yield`
    pub fn run_with(&self, deliver: Yield<T>) {
        (self.operation)(deliver);
    }

    // ------------------------------------------------------------------------
    // Functor / Monad
    // ------------------------------------------------------------------------

    /// Transform the success value; delivery stays on `self`'s executor
    pub fn map<U, F>(&self, f: F) -> Async<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Transform the success value with a fallible function
    pub fn try_map<U, F>(&self, f: F) -> Async<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Async::new(move |deliver: Yield<U>| {
            let f = f.clone();
            source.run(move |outcome| deliver.send(outcome.try_map(|value| f(value))));
        })
    }

    /// Sequence: when `self` succeeds, build the next computation from its
    /// value and run it. The next stage starts only after `self` delivered.
    pub fn flat_map<U, F>(&self, f: F) -> Async<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Async<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Async::new(move |deliver: Yield<U>| {
            let f = f.clone();
            source.run(move |outcome| {
                match outcome.try_map(|value| Ok(f(value))) {
                    Ok(next) => next.run_with(deliver),
                    Err(err) => deliver.send(Err(err)),
                }
            });
        })
    }

    /// Run `self`, discard its value, then run `other`
    pub fn then<U>(&self, other: Async<U>) -> Async<U>
    where
        U: Send + 'static,
    {
        self.flat_map(move |_| other.clone())
    }

    /// Same outcome, but the continuation is always scheduled onto `target`
    pub fn transferred(&self, target: &ExecutorRef) -> Async<T> {
        let source = self.clone();
        let target = target.clone();
        Async::new(move |deliver| {
            let target = target.clone();
            source.run(move |outcome| {
                target.execute(Box::new(move || deliver.send(outcome)));
            });
        })
    }

    // ------------------------------------------------------------------------
    // Parallel
    // ------------------------------------------------------------------------

    /// Run `self` and `other` concurrently and pair their values.
    ///
    /// Same join and error rule as `apply`: if both fail, `self`'s error wins.
    pub fn zip<B>(&self, other: &Async<B>, executor: &ExecutorRef) -> Async<(T, B)>
    where
        B: Send + 'static,
    {
        self.map(|a: T| move |b: B| (a, b)).apply(other, executor)
    }

    // ------------------------------------------------------------------------
    // Waiting
    // ------------------------------------------------------------------------

    /// Block the calling thread until the result is delivered.
    ///
    /// Must not be called from an executor this computation needs in order to
    /// make progress, such as a job on the same serial executor the
    /// computation schedules onto. That deadlocks, and cannot be detected here.
    pub fn wait(&self) -> Result<T> {
        let (sender, receiver) = oneshot::channel();
        self.run(move |outcome| {
            let _ = sender.send(outcome);
        });
        futures::executor::block_on(receiver).unwrap_or(Err(CascadeError::Abandoned))
    }
}

impl<F: Send + 'static> Async<F> {
    /// Parallel application.
    ///
    /// Both computations are started on `executor` without waiting on each
    /// other; the result is delivered after both have reported, on the thread
    /// of whichever finished last. When both fail, the error of the
    /// function-producing side (`self`) is reported.
    pub fn apply<T, U>(&self, value: &Async<T>, executor: &ExecutorRef) -> Async<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> U,
    {
        let functions = self.clone();
        let values = value.clone();
        let executor = executor.clone();
        Async::new(move |deliver: Yield<U>| {
            let barrier = JoinBarrier::new(move |f: Result<F>, x: Result<T>| {
                deliver.send(f.apply(x));
            });

            let left = barrier.clone();
            let functions = functions.clone();
            executor.execute(Box::new(move || {
                functions.run(move |outcome| left.complete_left(outcome));
            }));

            let right = barrier;
            let values = values.clone();
            executor.execute(Box::new(move || {
                values.run(move |outcome| right.complete_right(outcome));
            }));
        })
    }
}

impl<T: Send + 'static> IntoFuture for Async<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    /// Starts the computation immediately and resolves when it delivers
    fn into_future(self) -> Self::IntoFuture {
        let (sender, receiver) = oneshot::channel();
        self.run(move |outcome| {
            let _ = sender.send(outcome);
        });
        Box::pin(async move { receiver.await.unwrap_or(Err(CascadeError::Abandoned)) })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
