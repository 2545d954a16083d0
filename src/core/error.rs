//! core::error
//!
//! Structured error values for failed engine calls.
//!
//! # Overview
//!
//! Every failure an operation can report is an [`ErrorInfo`]: the engine's
//! raw status and class, a decoded [`ErrorCode`] and [`ErrorClass`], and the
//! engine's message text. The decoded values are a lookup of the raw
//! numbers, never an interpretation of the message.
//!
//! # Capture-then-carry
//!
//! The engine keeps its last-error record per thread and overwrites it on
//! the next call. [`translate`] must therefore run on the thread that made the
//! failing call, before that thread calls into the engine again. The result
//! is plain data and may be moved to any thread afterwards.
//!
//! # Local errors
//!
//! Two codes never come from the engine:
//! - [`ErrorCode::Argument`]: input rejected before any engine call
//! - [`ErrorCode::Internal`]: a task protocol invariant was violated
//!
//! # Example
//!
//! ```
//! use gitteh::core::error::{translate, ErrorCategory, LastError};
//!
//! // Status -3 is "not found", class 4 is "reference".
//! let err = translate(-3, Some(LastError::new(4, "reference 'refs/heads/x' not found")))
//!     .unwrap_err();
//! assert_eq!(err.category(), ErrorCategory::NotFound);
//! assert_eq!(err.raw_code, -3);
//!
//! assert!(translate(0, None).is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::TypeError;

/// Status used for errors raised locally rather than by the engine.
pub const LOCAL_STATUS: i32 = -1;

/// Engine status codes (`GIT_E*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Generic failure (`GIT_ERROR`).
    Generic,
    NotFound,
    Exists,
    Ambiguous,
    BufSize,
    User,
    BareRepo,
    UnbornBranch,
    Unmerged,
    NotFastForward,
    InvalidSpec,
    Conflict,
    Locked,
    Modified,
    Auth,
    Certificate,
    Applied,
    Peel,
    Eof,
    Invalid,
    Uncommitted,
    Directory,
    MergeConflict,
    Passthrough,
    IterOver,
    Retry,
    Mismatch,
    IndexDirty,
    ApplyFail,
    Owner,
    Timeout,
    /// Input rejected before reaching the engine.
    Argument,
    /// The task protocol violated one of its own invariants.
    Internal,
}

impl ErrorCode {
    /// Decode an engine status. Unknown negative values decode as `Generic`.
    pub fn from_raw(status: i32) -> Self {
        match status {
            -3 => ErrorCode::NotFound,
            -4 => ErrorCode::Exists,
            -5 => ErrorCode::Ambiguous,
            -6 => ErrorCode::BufSize,
            -7 => ErrorCode::User,
            -8 => ErrorCode::BareRepo,
            -9 => ErrorCode::UnbornBranch,
            -10 => ErrorCode::Unmerged,
            -11 => ErrorCode::NotFastForward,
            -12 => ErrorCode::InvalidSpec,
            -13 => ErrorCode::Conflict,
            -14 => ErrorCode::Locked,
            -15 => ErrorCode::Modified,
            -16 => ErrorCode::Auth,
            -17 => ErrorCode::Certificate,
            -18 => ErrorCode::Applied,
            -19 => ErrorCode::Peel,
            -20 => ErrorCode::Eof,
            -21 => ErrorCode::Invalid,
            -22 => ErrorCode::Uncommitted,
            -23 => ErrorCode::Directory,
            -24 => ErrorCode::MergeConflict,
            -30 => ErrorCode::Passthrough,
            -31 => ErrorCode::IterOver,
            -32 => ErrorCode::Retry,
            -33 => ErrorCode::Mismatch,
            -34 => ErrorCode::IndexDirty,
            -35 => ErrorCode::ApplyFail,
            -36 => ErrorCode::Owner,
            -37 => ErrorCode::Timeout,
            _ => ErrorCode::Generic,
        }
    }
}

/// Engine error classes (`GIT_ERROR_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    None,
    NoMemory,
    Os,
    Invalid,
    Reference,
    Zlib,
    Repository,
    Config,
    Regex,
    Odb,
    Index,
    Object,
    Net,
    Tag,
    Tree,
    Indexer,
    Ssl,
    Submodule,
    Thread,
    Stash,
    Checkout,
    FetchHead,
    Merge,
    Ssh,
    Filter,
    Revert,
    Callback,
    CherryPick,
    Describe,
    Rebase,
    Filesystem,
    Patch,
    Worktree,
    Sha,
    Http,
    Internal,
    Grafts,
    /// A class number this crate does not know.
    Unknown,
    /// Raised locally; the engine was never called.
    Argument,
}

impl ErrorClass {
    /// Decode an engine error class.
    pub fn from_raw(class: i32) -> Self {
        match class {
            0 => ErrorClass::None,
            1 => ErrorClass::NoMemory,
            2 => ErrorClass::Os,
            3 => ErrorClass::Invalid,
            4 => ErrorClass::Reference,
            5 => ErrorClass::Zlib,
            6 => ErrorClass::Repository,
            7 => ErrorClass::Config,
            8 => ErrorClass::Regex,
            9 => ErrorClass::Odb,
            10 => ErrorClass::Index,
            11 => ErrorClass::Object,
            12 => ErrorClass::Net,
            13 => ErrorClass::Tag,
            14 => ErrorClass::Tree,
            15 => ErrorClass::Indexer,
            16 => ErrorClass::Ssl,
            17 => ErrorClass::Submodule,
            18 => ErrorClass::Thread,
            19 => ErrorClass::Stash,
            20 => ErrorClass::Checkout,
            21 => ErrorClass::FetchHead,
            22 => ErrorClass::Merge,
            23 => ErrorClass::Ssh,
            24 => ErrorClass::Filter,
            25 => ErrorClass::Revert,
            26 => ErrorClass::Callback,
            27 => ErrorClass::CherryPick,
            28 => ErrorClass::Describe,
            29 => ErrorClass::Rebase,
            30 => ErrorClass::Filesystem,
            31 => ErrorClass::Patch,
            32 => ErrorClass::Worktree,
            33 => ErrorClass::Sha,
            34 => ErrorClass::Http,
            35 => ErrorClass::Internal,
            36 => ErrorClass::Grafts,
            _ => ErrorClass::Unknown,
        }
    }
}

/// Coarse failure categories.
///
/// A convenience view over code and class for callers that only need to
/// branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Wrong or missing input, detected before any engine call.
    Argument,
    /// The engine rejected an input such as a malformed reference name.
    InvalidArgument,
    NotFound,
    Ambiguous,
    /// Operating system or filesystem failure, including permissions.
    Io,
    OutOfMemory,
    /// Protocol invariant violation.
    Internal,
    /// Anything else the engine reported.
    Other,
}

/// The engine's last-error record, read right after a failing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Raw error class.
    pub class: i32,
    /// Detail message.
    pub message: String,
}

impl LastError {
    pub fn new(class: i32, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

/// A failed operation, as seen by host code.
///
/// Carries everything needed to describe the failure without going back
/// to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ErrorInfo {
    /// Decoded status.
    pub code: ErrorCode,
    /// Decoded class.
    pub class: ErrorClass,
    /// Status exactly as the engine returned it.
    pub raw_code: i32,
    /// Class exactly as the engine reported it.
    pub raw_class: i32,
    /// Detail message.
    pub message: String,
}

impl ErrorInfo {
    /// Build from a raw engine status, class and message.
    pub fn from_status(status: i32, class: i32, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_raw(status),
            class: ErrorClass::from_raw(class),
            raw_code: status,
            raw_class: class,
            message: message.into(),
        }
    }

    /// Input rejected before reaching the engine.
    pub fn argument(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Argument,
            class: ErrorClass::Argument,
            raw_code: LOCAL_STATUS,
            raw_class: LOCAL_STATUS,
            message: message.into(),
        }
    }

    /// Protocol invariant violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            class: ErrorClass::Internal,
            raw_code: LOCAL_STATUS,
            raw_class: 35,
            message: message.into(),
        }
    }

    /// The engine reported success but produced nothing.
    pub fn success_without_result() -> Self {
        Self::internal("bug: success without result")
    }

    /// A wrapper was used after its handle was released or transferred.
    pub fn invalid_handle(kind: &str) -> Self {
        Self::argument(format!("{kind} handle is no longer valid"))
    }

    /// The coarse category of this failure.
    pub fn category(&self) -> ErrorCategory {
        match self.code {
            ErrorCode::Argument => return ErrorCategory::Argument,
            ErrorCode::Internal => return ErrorCategory::Internal,
            ErrorCode::NotFound => return ErrorCategory::NotFound,
            ErrorCode::Ambiguous => return ErrorCategory::Ambiguous,
            ErrorCode::InvalidSpec | ErrorCode::Invalid => {
                return ErrorCategory::InvalidArgument
            }
            _ => {}
        }
        match self.class {
            ErrorClass::NoMemory => ErrorCategory::OutOfMemory,
            ErrorClass::Os | ErrorClass::Filesystem => ErrorCategory::Io,
            ErrorClass::Invalid => ErrorCategory::InvalidArgument,
            _ => ErrorCategory::Other,
        }
    }

    /// Check if this is a not-found failure.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// The error as a host-facing JSON object.
    ///
    /// ```
    /// use gitteh::core::error::ErrorInfo;
    ///
    /// let value = ErrorInfo::argument("path required").to_json();
    /// assert_eq!(value["code"], "argument");
    /// assert_eq!(value["message"], "path required");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "class": self.class,
            "rawCode": self.raw_code,
            "rawClass": self.raw_class,
            "message": self.message,
        })
    }
}

impl From<TypeError> for ErrorInfo {
    fn from(err: TypeError) -> Self {
        ErrorInfo::argument(err.to_string())
    }
}

/// Translate an engine status into a result.
///
/// Non-negative statuses are success. A negative status becomes an
/// [`ErrorInfo`] built from `last_error`; when the engine left no record the
/// message says so rather than inventing one.
pub fn translate(status: i32, last_error: Option<LastError>) -> Result<(), ErrorInfo> {
    if status >= 0 {
        return Ok(());
    }
    let info = match last_error {
        Some(last) => ErrorInfo::from_status(status, last.class, last.message),
        None => ErrorInfo::from_status(status, 0, format!("engine call failed with status {status}")),
    };
    Err(info)
}
