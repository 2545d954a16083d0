//! api
//!
//! Host-visible wrappers and their dual-mode operations.
//!
//! # Operations
//!
//! | Operation | Blocking | Non-blocking |
//! |---|---|---|
//! | Repository open | [`Repository::open_sync`] | [`Repository::open`] |
//! | Repository discover | [`Repository::discover_sync`] | [`Repository::discover`] |
//! | Commit lookup | [`Commit::lookup_sync`] | [`Commit::lookup`] |
//! | Reference lookup | [`Reference::lookup_sync`] | [`Reference::lookup`] |
//! | Reference resolve | [`Reference::resolve_sync`] | [`Reference::resolve`] |
//! | Message prettify | [`message::prettify`] | none |
//!
//! Blocking variants return the result directly. Non-blocking variants
//! return a [`TaskId`](crate::core::types::TaskId) once the task is queued
//! and hand the result to the continuation later, from the runtime's host
//! loop. In both, input errors are returned before any engine call.
//!
//! # Invariants
//!
//! - Wrappers are created only from a live engine resource, inside complete
//! - Wrappers are `!Send` and never leave the host thread
//! - A transferred wrapper is invalid: accessors and operations taking it
//!   fail with an argument error

pub mod commit;
pub mod message;
pub mod reference;
pub mod repository;

pub use commit::Commit;
pub use reference::Reference;
pub use repository::Repository;
