//! Cascade Core
//!
//! Composable primitives for asynchronous computation in a client application:
//! - `Async`: a lazy, re-runnable computation that delivers exactly one
//!   `Result` to a continuation, with map / flat_map / parallel apply /
//!   executor transfer and a blocking `wait`
//! - `Atom`: a mutable cell whose reads and writes are serialized through a
//!   private executor, broadcasting snapshots to observers
//! - executors and the `Executors` configuration that every scheduling
//!   component receives explicitly

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod async_op;
pub mod atom;
pub mod config;
pub mod errors;
pub mod executor;
mod join;
pub mod outcome;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use async_op::{Async, Yield};
pub use atom::{Atom, Observer, ObserverId};
pub use config::{Executors, SerialFactory};
pub use errors::{CascadeError, CascadeResult, Result, TransportError};
pub use executor::{
    Executor, ExecutorRef, InlineExecutor, Job, SerialExecutor, ThreadExecutor, TokioExecutor,
};
pub use outcome::{catch_panic, ApplyExt, ResultExt};
