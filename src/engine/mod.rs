//! engine
//!
//! The task protocol: Prepare -> Execute -> Complete.
//!
//! # Architecture
//!
//! Every operation is split into three phases that run on known threads:
//!
//! 1. **Prepare** (host thread): validate inputs, copy everything the engine
//!    call needs, retain the resources it reads. This is the task's
//!    constructor; a failure here is returned to the caller directly and
//!    nothing is scheduled.
//! 2. **Execute** (worker thread, or host thread in blocking mode): call the
//!    engine using only data the task owns; write the raw output or the
//!    captured [`ErrorInfo`] into the [`TaskRequest`].
//! 3. **Complete** (host thread): wrap raw outputs into host objects, invoke
//!    the continuation exactly once, then drop the task's inputs, which
//!    releases its retains.
//!
//! ```text
//! Created -> Prepared -> Executing -> Completed
//!    \
//!     -> PrepareFailed
//! ```
//!
//! # Invariants
//!
//! - Execute never sees a host object; a [`Task`] must be `Send`
//! - A task whose execute reports success but leaves no output completes
//!   with "bug: success without result"
//! - A panic inside execute is caught and completes the task with an
//!   internal error
//! - Illegal state transitions are reported as internal errors, never
//!   ignored
//!
//! # Modules
//!
//! - [`dispatch`]: worker pool that runs execute phases
//! - [`runner`]: the host-side [`Runtime`] and its completion queue

pub mod dispatch;
pub mod runner;

pub use dispatch::{Dispatcher, DispatchError};
pub use runner::{Runtime, RuntimeError};

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::core::error::ErrorInfo;
use crate::core::types::TaskId;
use crate::git::Backend;

/// One asynchronous operation's inputs and phases.
///
/// A value of the implementing type is what prepare produces: owned copies
/// of every argument plus [`Retained`](crate::core::handle::Retained)
/// references to the resources it reads.
pub trait Task<B: Backend>: Send + 'static {
    /// Raw engine output, produced on the worker.
    type Raw: Send + 'static;
    /// Host-visible result handed to the continuation.
    type Output: 'static;

    /// Operation name, for logs.
    const NAME: &'static str;

    /// Call the engine. Write the result into `output` on success.
    fn execute(&self, backend: &B, output: &mut Option<Self::Raw>) -> Result<(), ErrorInfo>;

    /// Turn the raw output into the host-visible result. Host thread only.
    fn complete(raw: Self::Raw) -> Self::Output;
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Prepared,
    Executing,
    Completed,
    PrepareFailed,
}

impl TaskState {
    /// Whether the protocol allows moving from `self` to `next`.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Created, TaskState::Prepared)
                | (TaskState::Created, TaskState::PrepareFailed)
                | (TaskState::Prepared, TaskState::Executing)
                | (TaskState::Executing, TaskState::Completed)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::PrepareFailed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Created => "created",
            TaskState::Prepared => "prepared",
            TaskState::Executing => "executing",
            TaskState::Completed => "completed",
            TaskState::PrepareFailed => "prepare-failed",
        };
        f.write_str(name)
    }
}

/// Per-call state carried across the three phases.
pub struct TaskRequest<B: Backend, T: Task<B>> {
    id: TaskId,
    state: TaskState,
    task: T,
    output: Option<T::Raw>,
    error: Option<ErrorInfo>,
    _backend: std::marker::PhantomData<fn(&B)>,
}

impl<B: Backend, T: Task<B>> TaskRequest<B, T> {
    /// Run the prepare step's outcome through the state machine.
    ///
    /// # Errors
    ///
    /// Returns the prepare error unchanged; the task ends in `PrepareFailed`.
    pub fn prepare(id: TaskId, prepared: Result<T, ErrorInfo>) -> Result<Self, ErrorInfo> {
        match prepared {
            Ok(task) => {
                let mut request = Self {
                    id,
                    state: TaskState::Created,
                    task,
                    output: None,
                    error: None,
                    _backend: std::marker::PhantomData,
                };
                request.advance(TaskState::Prepared)?;
                trace!(task_id = %id, op = T::NAME, "prepared");
                Ok(request)
            }
            Err(err) => {
                debug!(
                    task_id = %id,
                    op = T::NAME,
                    from = %TaskState::Created,
                    to = %TaskState::PrepareFailed,
                    error = %err,
                    "prepare failed"
                );
                Err(err)
            }
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn advance(&mut self, next: TaskState) -> Result<(), ErrorInfo> {
        if !self.state.can_advance_to(next) {
            return Err(ErrorInfo::internal(format!(
                "{} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Run the execute phase on the current thread.
    ///
    /// Never panics and never touches host objects. The outcome is stored
    /// in the request for [`complete`](Self::complete) to read.
    pub fn execute(&mut self, backend: &B) {
        if let Err(err) = self.advance(TaskState::Executing) {
            self.error = Some(err);
            return;
        }
        trace!(task_id = %self.id, op = T::NAME, "executing");

        let task = &self.task;
        let output = &mut self.output;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.execute(backend, output)));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.output = None;
                self.error = Some(err);
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.output = None;
                self.error = Some(ErrorInfo::internal(format!(
                    "{} panicked during execute: {}",
                    T::NAME,
                    detail
                )));
            }
        }
    }

    /// Run the complete phase and hand the result to `continuation`.
    ///
    /// Retained inputs are released after the continuation returns.
    pub fn complete<R>(
        mut self,
        continuation: impl FnOnce(Result<T::Output, ErrorInfo>) -> R,
    ) -> R {
        let result = match self.advance(TaskState::Completed) {
            Err(err) => Err(self.error.take().unwrap_or(err)),
            Ok(()) => match (self.error.take(), self.output.take()) {
                (Some(err), _) => Err(err),
                (None, Some(raw)) => Ok(T::complete(raw)),
                (None, None) => Err(ErrorInfo::success_without_result()),
            },
        };

        match &result {
            Ok(_) => debug!(task_id = %self.id, op = T::NAME, "completed"),
            Err(err) => debug!(task_id = %self.id, op = T::NAME, error = %err, "completed with error"),
        }

        let returned = continuation(result);
        drop(self);
        returned
    }
}

impl<B: Backend, T: Task<B>> Drop for TaskRequest<B, T> {
    fn drop(&mut self) {
        trace!(task_id = %self.id, state = %self.state, "released task inputs");
    }
}

impl<B: Backend, T: Task<B>> std::fmt::Debug for TaskRequest<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRequest")
            .field("id", &self.id)
            .field("op", &T::NAME)
            .field("state", &self.state)
            .field("has_output", &self.output.is_some())
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::testing::{MockBackend, Probe};
    use super::*;
    use crate::core::error::ErrorCode;

    fn request(probe: Probe) -> TaskRequest<MockBackend, Probe> {
        TaskRequest::prepare(TaskId::new(1), Ok(probe)).unwrap()
    }

    mod state_machine {
        use super::*;

        #[test]
        fn legal_transitions() {
            assert!(TaskState::Created.can_advance_to(TaskState::Prepared));
            assert!(TaskState::Created.can_advance_to(TaskState::PrepareFailed));
            assert!(TaskState::Prepared.can_advance_to(TaskState::Executing));
            assert!(TaskState::Executing.can_advance_to(TaskState::Completed));
        }

        #[test]
        fn illegal_transitions() {
            assert!(!TaskState::Prepared.can_advance_to(TaskState::PrepareFailed));
            assert!(!TaskState::Prepared.can_advance_to(TaskState::Completed));
            assert!(!TaskState::Completed.can_advance_to(TaskState::Executing));
            assert!(!TaskState::PrepareFailed.can_advance_to(TaskState::Prepared));
        }

        #[test]
        fn terminal_states() {
            assert!(TaskState::Completed.is_terminal());
            assert!(TaskState::PrepareFailed.is_terminal());
            assert!(!TaskState::Executing.is_terminal());
        }
    }

    mod phases {
        use super::*;

        #[test]
        fn prepare_failure_is_returned() {
            let result = TaskRequest::<MockBackend, Probe>::prepare(
                TaskId::new(1),
                Err(ErrorInfo::argument("missing path")),
            );
            assert_eq!(result.unwrap_err().code, ErrorCode::Argument);
        }

        #[test]
        fn success_delivers_output() {
            let backend = MockBackend::new();
            let mut req = request(Probe::Value(7));
            assert_eq!(req.state(), TaskState::Prepared);

            req.execute(&backend);
            assert_eq!(req.state(), TaskState::Executing);

            let result = req.complete(|r| r);
            assert_eq!(result.unwrap(), 7);
        }

        #[test]
        fn engine_error_delivered() {
            let backend = MockBackend::new();
            let mut req = request(Probe::Fail(ErrorInfo::from_status(-3, 4, "gone")));
            req.execute(&backend);
            let err = req.complete(|r| r).unwrap_err();
            assert!(err.is_not_found());
        }

        #[test]
        fn success_without_output_is_internal() {
            let backend = MockBackend::new();
            let mut req = request(Probe::Nothing);
            req.execute(&backend);
            let err = req.complete(|r| r).unwrap_err();
            assert_eq!(err.code, ErrorCode::Internal);
            assert_eq!(err.message, "bug: success without result");
        }

        #[test]
        fn panic_is_caught() {
            let backend = MockBackend::new();
            let mut req = request(Probe::Panic);
            req.execute(&backend);
            let err = req.complete(|r| r).unwrap_err();
            assert_eq!(err.code, ErrorCode::Internal);
            assert!(err.message.contains("panicked"));
        }

        #[test]
        fn complete_without_execute_is_internal() {
            let req = request(Probe::Value(1));
            let err = req.complete(|r| r).unwrap_err();
            assert_eq!(err.code, ErrorCode::Internal);
        }

        #[test]
        fn executing_twice_is_internal() {
            let backend = MockBackend::new();
            let mut req = request(Probe::Value(1));
            req.execute(&backend);
            req.execute(&backend);
            let err = req.complete(|r| r).unwrap_err();
            assert_eq!(err.code, ErrorCode::Internal);
        }

        #[test]
        fn continuation_runs_before_release() {
            let backend = MockBackend::new();
            let owner = backend.repository_owner("/repo");
            let mut req = request(Probe::Retaining(owner.retain().unwrap()));
            req.execute(&backend);

            let seen = req.complete(|_| owner.retain_count());
            assert_eq!(seen, 1);
            assert_eq!(owner.retain_count(), 0);
        }
    }
}
