//! core
//!
//! Building blocks shared by every operation.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ObjectId, TaskId
//! - [`error`] - Engine status translation and the host-visible ErrorInfo
//! - [`handle`] - Ownership of engine resources: owners, retains, transfer
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Everything that crosses to a worker thread is plain owned data
//! - Invalid identifiers cannot be constructed
//! - Engine resources have exactly one owner on the host side

pub mod config;
pub mod error;
pub mod handle;
pub mod types;
