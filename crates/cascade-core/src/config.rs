//! Executor Configuration
//!
//! Instead of process-wide default queues, every component that schedules
//! work receives an `Executors` value naming the general-purpose executor and
//! how to create private serial executors. Tests inject synchronous ones.

use crate::errors::Result;
use crate::executor::{
    ExecutorRef, InlineExecutor, SerialExecutor, ThreadExecutor, TokioExecutor,
};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Factory creating a fresh serial executor for the given label
pub type SerialFactory = Arc<dyn Fn(&str) -> Result<ExecutorRef> + Send + Sync>;

/// The executors a component is allowed to schedule work on
#[derive(Clone)]
pub struct Executors {
    general: ExecutorRef,
    serial_factory: SerialFactory,
}

impl Executors {
    pub fn new(general: ExecutorRef, serial_factory: SerialFactory) -> Self {
        Self {
            general,
            serial_factory,
        }
    }

    /// General-purpose work on a tokio runtime, serial work on dedicated threads
    pub fn tokio(handle: Handle) -> Self {
        Self::new(
            Arc::new(TokioExecutor::new(handle)),
            Arc::new(serial_thread),
        )
    }

    /// Same as `tokio`, using the runtime the caller runs inside
    pub fn current() -> Result<Self> {
        let executor = TokioExecutor::current()?;
        Ok(Self::tokio(executor.handle().clone()))
    }

    /// Thread-per-job general executor, no runtime required.
    ///
    /// Every transfer and observer notification costs an OS thread; prefer
    /// `tokio` or `current` wherever a runtime exists.
    pub fn threads() -> Self {
        Self::new(
            Arc::new(ThreadExecutor),
            Arc::new(serial_thread),
        )
    }

    /// Everything runs on the calling thread.
    ///
    /// Only serial as long as callers are single-threaded; meant for
    /// deterministic tests.
    pub fn inline() -> Self {
        Self::new(
            Arc::new(InlineExecutor),
            Arc::new(serial_inline),
        )
    }

    /// Replace the general-purpose executor
    pub fn with_general(mut self, general: ExecutorRef) -> Self {
        self.general = general;
        self
    }

    pub fn general(&self) -> &ExecutorRef {
        &self.general
    }

    /// Create a new private serial executor
    pub fn serial(&self, label: &str) -> Result<ExecutorRef> {
        (self.serial_factory)(label)
    }
}

fn serial_thread(label: &str) -> Result<ExecutorRef> {
    Ok(Arc::new(SerialExecutor::new(label)?))
}

fn serial_inline(_label: &str) -> Result<ExecutorRef> {
    Ok(Arc::new(InlineExecutor))
}

/// The current tokio runtime when there is one, else `threads`
impl Default for Executors {
    fn default() -> Self {
        Self::current().unwrap_or_else(|_| Self::threads())
    }
}

impl fmt::Debug for Executors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executors")
            .field("general", &self.general.label())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_preset_labels() {
        let executors = Executors::inline();
        assert_eq!(executors.general().label(), "inline");
        assert_eq!(executors.serial("atom").unwrap().label(), "inline");
    }

    #[test]
    fn test_threads_preset_creates_named_serial_executors() {
        let executors = Executors::default();
        assert_eq!(executors.general().label(), "thread");
        assert_eq!(executors.serial("model").unwrap().label(), "model");
    }

    #[test]
    fn test_current_outside_runtime_fails() {
        assert!(Executors::current().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_default_inside_runtime_uses_tokio() {
        let executors = Executors::default();
        assert_eq!(executors.general().label(), "tokio");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_current_inside_runtime_uses_tokio() {
        let executors = Executors::current().unwrap();
        assert_eq!(executors.general().label(), "tokio");
    }
}
