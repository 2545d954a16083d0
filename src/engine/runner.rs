//! engine::runner
//!
//! The host-side runtime: submission, completion queue, and host loop.
//!
//! # Architecture
//!
//! ```text
//! host thread                       worker thread
//! -----------                       -------------
//! submit: prepare, park request --> execute against the backend
//!                                   send task id on completion queue
//! poll / run_until_idle / drive <-- (id)
//!   complete, continuation, release
//! ```
//!
//! A prepared [`TaskRequest`] sits in a shared slot. The worker fills in its
//! output; only the task id travels back through the queue. The host then
//! takes the request out of the slot and completes it, so host-side values
//! (continuations, wrappers) never leave the host thread.
//!
//! # Invariants
//!
//! - [`Runtime`] is `!Send`; continuations run only inside `poll`,
//!   `run_until_idle`, `drive`, or the runtime's drop
//! - Every accepted task's continuation runs exactly once
//! - A task rejected in prepare never reaches a worker and its continuation
//!   never runs
//!
//! # Example
//!
//! ```no_run
//! use gitteh::{Config, Repository, Runtime};
//!
//! let rt = Runtime::new(&Config::default())?;
//! Repository::open(&rt, "/path/to/repo", None, |result| {
//!     match result.and_then(|repo| Ok(repo.path()?.display().to_string())) {
//!         Ok(path) => println!("opened {path}"),
//!         Err(err) => eprintln!("open failed: {err}"),
//!     }
//! })?;
//! rt.run_until_idle();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, debug_span, warn};

use super::dispatch::{DispatchError, Dispatcher, Job};
use super::{Task, TaskRequest};
use crate::core::config::{Config, ConfigError};
use crate::core::error::ErrorInfo;
use crate::core::types::TaskId;
use crate::git::{Backend, Git};

/// Errors from building a runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool error: {0}")]
    Dispatch(#[from] DispatchError),
}

type Finisher = Box<dyn FnOnce()>;

/// Host-thread entry point for every operation.
pub struct Runtime<B: Backend = Git> {
    backend: Arc<B>,
    dispatcher: Dispatcher,
    completed_tx: UnboundedSender<TaskId>,
    completed_rx: RefCell<UnboundedReceiver<TaskId>>,
    pending: RefCell<HashMap<TaskId, Finisher>>,
    next_id: Cell<u64>,
}

impl Runtime<Git> {
    /// Build a libgit2-backed runtime.
    pub fn new(config: &Config) -> Result<Self, RuntimeError> {
        Self::with_backend(Git::new(), config)
    }

    /// Build a libgit2-backed runtime from the config file search path.
    ///
    /// Load warnings are logged.
    pub fn load() -> Result<Self, RuntimeError> {
        let result = Config::load()?;
        for warning in &result.warnings {
            warn!(path = %warning.path.display(), "{}", warning.message);
        }
        Self::new(&result.config)
    }
}

impl<B: Backend> Runtime<B> {
    /// Build a runtime over any backend.
    pub fn with_backend(backend: B, config: &Config) -> Result<Self, RuntimeError> {
        let dispatcher = Dispatcher::new(config.worker_threads(), config.thread_name())?;
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();

        Ok(Self {
            backend: Arc::new(backend),
            dispatcher,
            completed_tx,
            completed_rx: RefCell::new(completed_rx),
            pending: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Tasks submitted whose continuation has not run yet.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.dispatcher.workers()
    }

    fn allocate_id(&self) -> TaskId {
        let raw = self.next_id.get();
        self.next_id.set(raw + 1);
        TaskId::new(raw)
    }

    /// Run a task's three phases on the calling thread.
    pub fn run_sync<T: Task<B>>(
        &self,
        prepared: Result<T, ErrorInfo>,
    ) -> Result<T::Output, ErrorInfo> {
        let id = self.allocate_id();
        let mut request = TaskRequest::<B, T>::prepare(id, prepared)?;
        request.execute(&self.backend);
        request.complete(|result| result)
    }

    /// Schedule a task's execute phase on the worker pool.
    ///
    /// Returns as soon as the task is queued. The continuation runs later,
    /// on this thread, from the host loop.
    ///
    /// # Errors
    ///
    /// The prepare error, or an internal error if the pool is shut down.
    /// In both cases the continuation is dropped without being called.
    pub fn submit<T, F>(&self, prepared: Result<T, ErrorInfo>, continuation: F) -> Result<TaskId, ErrorInfo>
    where
        T: Task<B>,
        F: FnOnce(Result<T::Output, ErrorInfo>) + 'static,
    {
        let id = self.allocate_id();
        let request = TaskRequest::<B, T>::prepare(id, prepared)?;
        let slot = Arc::new(Mutex::new(Some(request)));

        let job: Job = {
            let slot = Arc::clone(&slot);
            let backend = Arc::clone(&self.backend);
            let completed = self.completed_tx.clone();
            Box::new(move || {
                let _span = debug_span!("task", task_id = %id, op = T::NAME).entered();
                if let Some(request) = slot.lock().as_mut() {
                    request.execute(&backend);
                }
                // The receiver outlives every worker.
                let _ = completed.send(id);
            })
        };

        let finisher: Finisher = Box::new(move || {
            let request = slot.lock().take();
            match request {
                Some(request) => request.complete(continuation),
                None => continuation(Err(ErrorInfo::internal(format!(
                    "{} completed twice",
                    id
                )))),
            }
        });

        self.pending.borrow_mut().insert(id, finisher);
        if let Err(err) = self.dispatcher.submit(job) {
            self.pending.borrow_mut().remove(&id);
            return Err(ErrorInfo::internal(format!("cannot schedule {}: {}", id, err)));
        }

        debug!(task_id = %id, op = T::NAME, "submitted");
        Ok(id)
    }

    fn finish(&self, id: TaskId) -> bool {
        let finisher = self.pending.borrow_mut().remove(&id);
        match finisher {
            Some(finisher) => {
                finisher();
                true
            }
            None => {
                warn!(task_id = %id, "completion for unknown task");
                false
            }
        }
    }

    /// Run every completion already delivered. Never blocks.
    ///
    /// Returns the number of continuations run.
    pub fn poll(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.completed_rx.borrow_mut().try_recv();
            match next {
                Ok(id) => {
                    if self.finish(id) {
                        ran += 1;
                    }
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Block until no task is outstanding, running continuations as their
    /// tasks finish.
    ///
    /// Tasks submitted by continuations are waited for too. Must not be
    /// called from inside an async context; use [`drive`](Self::drive)
    /// there.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.pending() > 0 {
            let next = self.completed_rx.borrow_mut().blocking_recv();
            match next {
                Some(id) => {
                    if self.finish(id) {
                        ran += 1;
                    }
                }
                None => break,
            }
        }
        ran
    }

    /// Async form of [`run_until_idle`](Self::run_until_idle) for hosts on a
    /// current-thread tokio runtime.
    pub async fn drive(&self) -> usize {
        let mut ran = 0;
        while self.pending() > 0 {
            let next =
                std::future::poll_fn(|cx| self.completed_rx.borrow_mut().poll_recv(cx)).await;
            match next {
                Some(id) => {
                    if self.finish(id) {
                        ran += 1;
                    }
                }
                None => break,
            }
        }
        ran
    }
}

impl<B: Backend> Drop for Runtime<B> {
    fn drop(&mut self) {
        let outstanding = self.pending();
        if outstanding > 0 {
            debug!(outstanding, "draining tasks before shutdown");
        }
        self.dispatcher.shutdown();
        self.poll();
    }
}

impl<B: Backend> std::fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatcher", &self.dispatcher)
            .field("pending", &self.pending())
            .finish()
    }
}
