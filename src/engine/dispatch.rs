//! engine::dispatch
//!
//! Fixed worker pool for execute phases.
//!
//! # Architecture
//!
//! Jobs go through one unbounded crossbeam channel shared by every worker.
//! Whichever worker is free takes the next job. Nothing is promised about
//! the order in which jobs finish.
//!
//! # Invariants
//!
//! - A submitted job runs exactly once, on a worker thread
//! - Shutdown stops intake, lets workers finish every queued job, then joins
//!   them
//! - The pool never runs host-side code; jobs report back by message

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// A unit of work for a worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors from the worker pool.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn { name: String, source: io::Error },

    #[error("dispatcher has been shut down")]
    ShutDown,
}

/// A fixed-size pool of named worker threads.
pub struct Dispatcher {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    name: String,
}

impl Dispatcher {
    /// Start `threads` workers named `{name}-{index}`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Spawn` if the OS refuses a thread. Workers
    /// already started are stopped before returning.
    pub fn new(threads: usize, name: &str) -> Result<Self, DispatchError> {
        let (sender, receiver) = channel::unbounded::<Job>();
        let mut dispatcher = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(threads),
            name: name.to_string(),
        };

        for index in 0..threads.max(1) {
            let thread_name = format!("{}-{}", name, index);
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(receiver));

            match spawned {
                Ok(handle) => dispatcher.workers.push(handle),
                Err(source) => {
                    dispatcher.shutdown();
                    return Err(DispatchError::Spawn {
                        name: thread_name,
                        source,
                    });
                }
            }
        }

        debug!(workers = dispatcher.workers.len(), name, "dispatcher started");
        Ok(dispatcher)
    }

    /// Queue a job and return immediately.
    pub fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self.sender.as_ref().ok_or(DispatchError::ShutDown)?;
        sender.send(job).map_err(|_| DispatchError::ShutDown)
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.is_none()
    }

    /// Stop intake, run what is queued, and join every worker.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                warn!(worker = %name, "worker thread panicked");
            }
        }
        debug!(name = %self.name, "dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("workers", &self.workers.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn worker_loop(jobs: Receiver<Job>) {
    trace!("worker started");
    // recv fails only once the channel is empty and every sender is gone.
    while let Ok(job) = jobs.recv() {
        job();
    }
    trace!("worker stopped");
}
