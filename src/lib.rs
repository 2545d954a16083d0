//! gitteh - Non-blocking access to libgit2 from a single-threaded host
//!
//! gitteh lets a host program that runs one cooperative thread drive a
//! blocking version-control engine without stalling. Every operation comes
//! in two forms: a blocking form that returns its result, and a
//! non-blocking form that runs on a worker pool and hands its result to a
//! continuation back on the host thread.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`api`] - Host-visible wrappers and dual-mode operations
//! - [`engine`] - Prepare → Execute → Complete task protocol, worker pool, host loop
//! - [`core`] - Identifier types, error translation, handle ownership, config
//! - [`git`] - Single interface to the engine (libgit2 via git2)
//! - [`logging`] - tracing subscriber setup
//!
//! # Correctness Invariants
//!
//! gitteh maintains the following invariants:
//!
//! 1. Host-visible objects are created, used and dropped only on the host thread
//! 2. Every engine resource is freed exactly once
//! 3. A resource read by an in-flight task outlives the task
//! 4. Every accepted operation invokes its continuation exactly once
//!
//! # Example
//!
//! ```no_run
//! use gitteh::{Commit, Config, Reference, Repository, Runtime};
//!
//! let rt = Runtime::new(&Config::default()).unwrap();
//! let repo = Repository::open_sync(&rt, ".", None).unwrap();
//! let head = Reference::resolve_sync(&rt, &repo, "HEAD").unwrap();
//!
//! Commit::lookup(&rt, &repo, head, |result| match result {
//!     Ok(commit) => println!("{}", commit.summary().unwrap().unwrap_or_default()),
//!     Err(err) => eprintln!("lookup failed: {err}"),
//! })
//! .unwrap();
//! rt.run_until_idle();
//! ```

pub mod api;
pub mod core;
pub mod engine;
pub mod git;
pub mod logging;

pub use api::{message, Commit, Reference, Repository};
pub use crate::core::config::Config;
pub use crate::core::error::{ErrorCategory, ErrorInfo};
pub use crate::core::types::{ObjectId, TaskId};
pub use engine::{Runtime, RuntimeError};
pub use git::{Backend, Git, OpenFlags, OpenOptions};
