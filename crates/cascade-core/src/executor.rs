//! Executors
//!
//! An executor is a place where scheduled work runs. The core needs two
//! flavors:
//! - general-purpose executors that may run many jobs at once
//!   (`TokioExecutor`, `ThreadExecutor`), and
//! - serial executors that run one job at a time in submission order
//!   (`SerialExecutor`).
//!
//! `InlineExecutor` runs jobs on the submitting thread and exists for
//! deterministic tests.
//!
//! A job that an executor drops without running releases whatever it
//! captured. Continuations captured that way report `CascadeError::Abandoned`
//! (see `Yield`), so a dropped job never leaves a waiter hanging.

use crate::errors::{CascadeError, Result};
use crate::outcome::{lock, panic_message};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A unit of work submitted to an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to any executor
pub type ExecutorRef = Arc<dyn Executor>;

// ----------------------------------------------------------------------------
// Executor Trait
// ----------------------------------------------------------------------------

/// Something that runs jobs "later"
pub trait Executor: Send + Sync + 'static {
    /// Schedule `job` to run on this executor
    fn execute(&self, job: Job);

    /// Human-readable name used in logs
    fn label(&self) -> &str;
}

/// Run a job, keeping a panicking job from taking its worker down with it
fn run_job(job: Job, label: &str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        warn!(
            executor = label,
            payload = %panic_message(payload.as_ref()),
            "job panicked"
        );
    }
}

// ----------------------------------------------------------------------------
// Tokio Executor
// ----------------------------------------------------------------------------

/// General-purpose executor backed by a tokio runtime's blocking pool
///
/// Jobs are plain synchronous closures, so they go to `spawn_blocking` rather
/// than onto the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is currently running inside
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CascadeError::executor_error(e.to_string()))
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // The JoinHandle is not needed; completion is reported through the job itself.
        drop(self.handle.spawn_blocking(move || run_job(job, "tokio")));
    }

    fn label(&self) -> &str {
        "tokio"
    }
}

// ----------------------------------------------------------------------------
// Serial Executor
// ----------------------------------------------------------------------------

static SERIAL_WORKER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Executor running one job at a time, in submission order
///
/// Owns a dedicated worker thread draining an unbounded queue. The worker
/// exits once every handle to the executor has been dropped and the queue is
/// empty.
#[derive(Debug)]
pub struct SerialExecutor {
    label: String,
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialExecutor {
    pub fn new<T: Into<String>>(label: T) -> Result<Self> {
        let label = label.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker_label = label.clone();
        let thread_name = format!(
            "cascade-serial-{}",
            SERIAL_WORKER_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                debug!(executor = %worker_label, "serial worker started");
                while let Some(job) = receiver.blocking_recv() {
                    run_job(job, &worker_label);
                }
                debug!(executor = %worker_label, "serial worker stopped");
            })
            .map_err(|e| {
                CascadeError::executor_error(format!(
                    "failed to start serial worker `{label}`: {e}"
                ))
            })?;

        Ok(Self { label, sender })
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, job: Job) {
        if self.sender.send(job).is_err() {
            // Worker is gone; the returned job is dropped here.
            warn!(executor = %self.label, "serial worker unavailable, job dropped");
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

// ----------------------------------------------------------------------------
// Thread Executor
// ----------------------------------------------------------------------------

/// General-purpose executor that starts a fresh OS thread per job
///
/// Needs no runtime, which makes it the default outside of tokio. When no
/// thread can be started the job runs on the submitting thread instead.
#[derive(Debug, Clone, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        let slot = Arc::new(Mutex::new(Some(job)));
        let worker_slot = slot.clone();
        let spawned = std::thread::Builder::new()
            .name("cascade-worker".to_string())
            .spawn(move || {
                if let Some(job) = lock(&worker_slot).take() {
                    run_job(job, "thread");
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn worker thread, running job inline");
            if let Some(job) = lock(&slot).take() {
                run_job(job, "thread");
            }
        }
    }

    fn label(&self) -> &str {
        "thread"
    }
}

// ----------------------------------------------------------------------------
// Inline Executor
// ----------------------------------------------------------------------------

/// Runs every job immediately on the submitting thread
#[derive(Debug, Clone, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        run_job(job, "inline");
    }

    fn label(&self) -> &str {
        "inline"
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
