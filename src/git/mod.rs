//! git
//!
//! The version-control engine, seen from the task protocol.
//!
//! # Architecture
//!
//! [`Backend`] is the **only doorway** to the engine. Tasks call it from
//! worker threads; nothing else does. [`Git`] is the libgit2-backed
//! implementation and the only place in the crate that imports `git2`.
//!
//! # Responsibilities
//!
//! - Repository opening and discovery
//! - Commit lookup by identifier
//! - Reference lookup and name-to-identifier resolution
//! - Commit message prettifying
//!
//! # Invariants
//!
//! - Every fallible call returns its failure as an [`ErrorInfo`] captured on
//!   the calling thread
//! - A successful call always carries its result; there is no null output
//! - Resources free their engine state when dropped and never earlier
//!
//! # Example
//!
//! ```no_run
//! use gitteh::git::{Backend, Git};
//! use std::path::Path;
//!
//! let git = Git::new();
//! let repo = git.open(Path::new("."))?;
//! let head = git.reference_name_to_id(&repo, "HEAD")?;
//! println!("HEAD is at {}", head.short(7));
//! # Ok::<(), gitteh::ErrorInfo>(())
//! ```

mod interface;

pub use interface::{Git, GitCommit, GitReference, GitRepository};

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::error::ErrorInfo;
use crate::core::handle::Resource;
use crate::core::types::{ObjectId, SHA1_LEN};

bitflags! {
    /// Flags for extended repository opening.
    ///
    /// Values match libgit2's `GIT_REPOSITORY_OPEN_*`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Only open the repository at the given path; do not walk up.
        const NO_SEARCH = 1 << 0;
        /// Continue searching across filesystem boundaries.
        const CROSS_FS = 1 << 1;
        /// Open as bare, even if a working directory exists.
        const BARE = 1 << 2;
        /// Do not append `/.git` to the given path.
        const NO_DOTGIT = 1 << 3;
        /// Honor `GIT_DIR`, `GIT_CEILING_DIRECTORIES` and friends.
        const FROM_ENV = 1 << 4;
    }
}

/// Options that switch `open` into its extended form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Search behavior
    pub flags: OpenFlags,
    /// Directories at which the upward search stops
    pub ceiling_dirs: Vec<PathBuf>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn ceiling_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ceiling_dirs.push(dir.into());
        self
    }
}

/// State of an in-progress operation in a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    None,
    Merge,
    Revert,
    RevertSequence,
    CherryPick,
    CherryPickSequence,
    Bisect,
    Rebase,
    RebaseInteractive,
    RebaseMerge,
    ApplyMailbox,
    ApplyMailboxOrRebase,
}

impl RepositoryState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use gitteh::git::RepositoryState;
    ///
    /// assert!(!RepositoryState::None.is_in_progress());
    /// assert!(RepositoryState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, RepositoryState::None)
    }
}

/// Author or committer of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Timestamp, normalized to UTC
    pub when: chrono::DateTime<chrono::Utc>,
    /// Original timezone offset in minutes
    pub offset_minutes: i32,
}

/// Everything the host can read from a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: ObjectId,
    pub tree_id: ObjectId,
    pub parent_ids: Vec<ObjectId>,
    /// Full message (lossily decoded if not UTF-8)
    pub message: String,
    /// First paragraph of the message, newlines folded
    pub summary: Option<String>,
    pub author: Signature,
    pub committer: Signature,
}

/// Whether a reference points at an object or at another reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Direct,
    Symbolic,
}

/// Everything the host can read from a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Full name, e.g. `refs/heads/main`
    pub name: String,
    /// Short name, e.g. `main`
    pub shorthand: String,
    pub kind: ReferenceKind,
    /// Target object for direct references
    pub target: Option<ObjectId>,
    /// Target name for symbolic references
    pub symbolic_target: Option<String>,
    pub is_branch: bool,
    pub is_remote: bool,
    pub is_tag: bool,
}

/// An open repository.
pub trait RepositoryResource: Resource {
    /// Path to the git directory.
    fn path(&self) -> &Path;

    /// Path to the working directory, `None` when bare.
    fn workdir(&self) -> Option<&Path>;

    fn is_bare(&self) -> bool;

    /// Current operation state. Queries the engine on every call.
    fn state(&self) -> RepositoryState;
}

/// A looked-up commit.
pub trait CommitResource: Resource {
    fn record(&self) -> &CommitRecord;
}

/// A looked-up reference.
pub trait ReferenceResource: Resource {
    fn record(&self) -> &ReferenceRecord;
}

/// The engine capability consumed by the task protocol.
///
/// All methods block. They are called from worker threads in the
/// asynchronous variants and from the host thread in the blocking ones.
pub trait Backend: Send + Sync + 'static {
    type Repository: RepositoryResource;
    type Commit: CommitResource;
    type Reference: ReferenceResource;

    /// Whether ids of `len` bytes can be handed to the engine.
    ///
    /// Defaults to SHA-1 only.
    fn supports_id_len(&self, len: usize) -> bool {
        len == SHA1_LEN
    }

    /// Open the repository at exactly `path`.
    fn open(&self, path: &Path) -> Result<Self::Repository, ErrorInfo>;

    /// Open with search flags and ceiling directories.
    fn open_ext(
        &self,
        path: &Path,
        flags: OpenFlags,
        ceiling_dirs: &[PathBuf],
    ) -> Result<Self::Repository, ErrorInfo>;

    /// Walk up from `start` looking for a repository; return its git directory.
    fn discover(
        &self,
        start: &Path,
        across_fs: bool,
        ceiling_dirs: &[PathBuf],
    ) -> Result<PathBuf, ErrorInfo>;

    fn find_commit(&self, repo: &Self::Repository, id: &ObjectId)
        -> Result<Self::Commit, ErrorInfo>;

    fn find_reference(
        &self,
        repo: &Self::Repository,
        name: &str,
    ) -> Result<Self::Reference, ErrorInfo>;

    /// Resolve a reference name, following symbolic references, to an id.
    fn reference_name_to_id(
        &self,
        repo: &Self::Repository,
        name: &str,
    ) -> Result<ObjectId, ErrorInfo>;

    /// Clean up a commit message: trailing whitespace, repeated blank lines,
    /// and (when `comment_char` is set) comment lines.
    fn message_prettify(
        &self,
        message: &str,
        comment_char: Option<u8>,
    ) -> Result<String, ErrorInfo>;
}
