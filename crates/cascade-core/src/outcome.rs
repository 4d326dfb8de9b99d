//! Result helpers shared by every layer
//!
//! `std::result::Result` already covers `map`, `and_then` and `Ok`. This module
//! adds the pieces the async layer needs on top: converting panics raised by
//! caller-supplied closures into `Err`, and applicative application with a
//! fixed error precedence.

use crate::errors::{CascadeError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Run `f`, converting a panic into `CascadeError::Panicked`
pub fn catch_panic<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(CascadeError::panicked(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Result Extensions
// ----------------------------------------------------------------------------

/// Extra combinators over `Result<T>`
pub trait ResultExt<T> {
    /// Like `and_then`, but a panic inside `f` becomes `Err`
    fn try_map<U, F>(self, f: F) -> Result<U>
    where
        F: FnOnce(T) -> Result<U>;
}

impl<T> ResultExt<T> for Result<T> {
    fn try_map<U, F>(self, f: F) -> Result<U>
    where
        F: FnOnce(T) -> Result<U>,
    {
        match self {
            Ok(value) => catch_panic(move || f(value)),
            Err(err) => Err(err),
        }
    }
}

/// Applicative application for results holding a function
pub trait ApplyExt<F> {
    /// Apply the held function to `value`.
    ///
    /// When both sides failed, the function side's error is reported.
    fn apply<T, U>(self, value: Result<T>) -> Result<U>
    where
        F: FnOnce(T) -> U;
}

impl<F> ApplyExt<F> for Result<F> {
    fn apply<T, U>(self, value: Result<T>) -> Result<U>
    where
        F: FnOnce(T) -> U,
    {
        match (self, value) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(f), Ok(value)) => catch_panic(move || Ok(f(value))),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
