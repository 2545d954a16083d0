//! core::handle
//!
//! Ownership of engine resources.
//!
//! # Model
//!
//! - [`NativeHandle`]: one engine resource. Dropping the last reference to it
//!   runs the resource's own `Drop`, which is the engine's free.
//! - [`HandleOwner`]: the host-side owner of exactly one `NativeHandle`. It is
//!   `!Send`, so it can only be created, used and dropped on the host thread.
//! - [`Retained`]: a counted reference a task takes during prepare so the
//!   resource outlives the task even if its owner is dropped meanwhile.
//!
//! # Invariants
//!
//! - A `HandleOwner` is either valid (holds its handle) or invalid (the
//!   handle was transferred). Only a valid owner releases on drop.
//! - The resource is freed exactly once: when the owner and every
//!   outstanding `Retained` are gone.
//! - Nothing outside this module can free a resource.
//!
//! # Example
//!
//! ```
//! use gitteh::core::handle::{HandleOwner, NativeHandle, Resource};
//!
//! struct Buffer(Vec<u8>);
//! impl Resource for Buffer {
//!     const KIND: &'static str = "buffer";
//! }
//!
//! let mut first = HandleOwner::new(NativeHandle::new(Buffer(vec![1, 2, 3])));
//! let second = first.transfer().unwrap();
//! assert!(!first.is_valid());
//! assert_eq!(second.get().unwrap().0, vec![1, 2, 3]);
//! ```

use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::core::error::ErrorInfo;

/// An engine resource that can be wrapped in a [`NativeHandle`].
///
/// Implementors free their engine state in `Drop`. They must be `Sync`
/// because several in-flight tasks may read one resource at once; a
/// resource whose engine object is not thread-safe must serialize access
/// internally.
pub trait Resource: Send + Sync + 'static {
    /// Human-readable kind, used in errors and logs.
    const KIND: &'static str;
}

/// A live engine resource.
///
/// Created on whichever thread the engine produced the resource (usually a
/// worker) and handed to a [`HandleOwner`] on the host thread.
pub struct NativeHandle<R: Resource> {
    raw: Arc<R>,
}

impl<R: Resource> NativeHandle<R> {
    /// Take ownership of a freshly produced resource.
    pub fn new(resource: R) -> Self {
        Self {
            raw: Arc::new(resource),
        }
    }

    /// Borrow the resource.
    pub fn get(&self) -> &R {
        &self.raw
    }

    /// Take a counted reference for the duration of a task.
    pub fn retain(&self) -> Retained<R> {
        Retained {
            raw: Arc::clone(&self.raw),
        }
    }

    /// Number of outstanding retains.
    pub fn retain_count(&self) -> usize {
        Arc::strong_count(&self.raw) - 1
    }
}

impl<R: Resource> std::fmt::Debug for NativeHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &R::KIND)
            .field("retains", &self.retain_count())
            .finish()
    }
}

/// A counted reference held by a task.
///
/// Keeps the resource alive; grants read access only. Dropping it is the
/// release.
pub struct Retained<R: Resource> {
    raw: Arc<R>,
}

impl<R: Resource> Deref for Retained<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.raw
    }
}

impl<R: Resource> std::fmt::Debug for Retained<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retained").field("kind", &R::KIND).finish()
    }
}

/// Host-side exclusive owner of one [`NativeHandle`].
pub struct HandleOwner<R: Resource> {
    handle: Option<NativeHandle<R>>,
    // Host objects never leave the host thread.
    _host: PhantomData<Rc<()>>,
}

impl<R: Resource> HandleOwner<R> {
    /// Wrap a handle. Ownership is taken immediately and unconditionally.
    pub fn new(handle: NativeHandle<R>) -> Self {
        trace!(kind = R::KIND, "wrapped native handle");
        Self {
            handle: Some(handle),
            _host: PhantomData,
        }
    }

    /// Whether this owner still holds its handle.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Borrow the resource.
    ///
    /// # Errors
    ///
    /// Argument error if the handle was transferred away.
    pub fn get(&self) -> Result<&R, ErrorInfo> {
        self.handle
            .as_ref()
            .map(NativeHandle::get)
            .ok_or_else(|| ErrorInfo::invalid_handle(R::KIND))
    }

    /// Take a counted reference for a task.
    pub fn retain(&self) -> Result<Retained<R>, ErrorInfo> {
        self.handle
            .as_ref()
            .map(NativeHandle::retain)
            .ok_or_else(|| ErrorInfo::invalid_handle(R::KIND))
    }

    /// Number of tasks currently retaining this owner's resource.
    pub fn retain_count(&self) -> usize {
        self.handle.as_ref().map_or(0, NativeHandle::retain_count)
    }

    /// Mark this owner invalid and hand its handle out without freeing it.
    pub fn invalidate(&mut self) -> Option<NativeHandle<R>> {
        let handle = self.handle.take();
        if handle.is_some() {
            trace!(kind = R::KIND, "invalidated handle owner");
        }
        handle
    }

    /// Move the handle into a new owner, leaving this one invalid.
    pub fn transfer(&mut self) -> Result<Self, ErrorInfo> {
        self.invalidate()
            .map(Self::new)
            .ok_or_else(|| ErrorInfo::invalid_handle(R::KIND))
    }
}

impl<R: Resource> Drop for HandleOwner<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            trace!(
                kind = R::KIND,
                retains = handle.retain_count(),
                "releasing native handle"
            );
            drop(handle);
        }
    }
}

impl<R: Resource> std::fmt::Debug for HandleOwner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleOwner")
            .field("kind", &R::KIND)
            .field("valid", &self.is_valid())
            .finish()
    }
}
