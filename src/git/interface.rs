//! git::interface
//!
//! libgit2 backend using git2.
//!
//! This module provides the **single doorway** to libgit2. All engine calls
//! made by tasks flow through [`Git`], which turns every `git2::Error` into
//! an [`ErrorInfo`] on the thread that received it.
//!
//! # Thread safety
//!
//! `git2::Repository` may move between threads but must not be used from two
//! at once. [`GitRepository`] therefore keeps it behind a mutex: concurrent
//! tasks against one repository take turns inside the engine while the
//! cached `path`/`workdir`/`bare` accessors stay lock-free.
//!
//! Commits and references borrow their repository in git2, so the backend
//! copies what the host can read into a [`CommitRecord`] or
//! [`ReferenceRecord`] while the repository lock is held, and frees the git2
//! object before returning.
//!
//! # Error Handling
//!
//! `git2::Error` already carries libgit2's last-error record, read by git2
//! immediately after the failing call. The conversion below forwards its raw
//! code, class and message unchanged.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::{
    Backend, CommitRecord, CommitResource, OpenFlags, ReferenceKind, ReferenceRecord,
    ReferenceResource, RepositoryResource, RepositoryState, Signature,
};
use crate::core::error::{translate, ErrorInfo, LastError, LOCAL_STATUS};
use crate::core::handle::Resource;
use crate::core::types::ObjectId;

impl From<git2::Error> for ErrorInfo {
    fn from(err: git2::Error) -> Self {
        // git_error_t is unsigned in the bindings; classes are small
        let class = i32::try_from(err.raw_class()).unwrap_or(i32::MAX);
        let last = LastError::new(class, err.message());
        match translate(err.raw_code(), Some(last)) {
            Err(info) => info,
            // git2 never reports a non-negative code as an error
            Ok(()) => ErrorInfo::from_status(LOCAL_STATUS, class, err.message()),
        }
    }
}

fn to_object_id(oid: git2::Oid) -> Result<ObjectId, ErrorInfo> {
    ObjectId::from_bytes(oid.as_bytes())
        .map_err(|e| ErrorInfo::internal(format!("engine returned malformed id: {e}")))
}

fn to_git2_oid(id: &ObjectId) -> Result<git2::Oid, ErrorInfo> {
    Ok(git2::Oid::from_bytes(id.as_bytes())?)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Signature time as UTC; times chrono cannot represent become the epoch.
fn signature_time(seconds: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(seconds, 0).unwrap_or_else(|| {
        warn!(seconds, "signature time out of range, using the epoch");
        chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
    })
}

fn signature(sig: &git2::Signature<'_>) -> Signature {
    let when = sig.when();
    Signature {
        name: lossy(sig.name_bytes()),
        email: lossy(sig.email_bytes()),
        when: signature_time(when.seconds()),
        offset_minutes: when.offset_minutes(),
    }
}

fn repository_state(state: git2::RepositoryState) -> RepositoryState {
    match state {
        git2::RepositoryState::Clean => RepositoryState::None,
        git2::RepositoryState::Merge => RepositoryState::Merge,
        git2::RepositoryState::Revert => RepositoryState::Revert,
        git2::RepositoryState::RevertSequence => RepositoryState::RevertSequence,
        git2::RepositoryState::CherryPick => RepositoryState::CherryPick,
        git2::RepositoryState::CherryPickSequence => RepositoryState::CherryPickSequence,
        git2::RepositoryState::Bisect => RepositoryState::Bisect,
        git2::RepositoryState::Rebase => RepositoryState::Rebase,
        git2::RepositoryState::RebaseInteractive => RepositoryState::RebaseInteractive,
        git2::RepositoryState::RebaseMerge => RepositoryState::RebaseMerge,
        git2::RepositoryState::ApplyMailbox => RepositoryState::ApplyMailbox,
        git2::RepositoryState::ApplyMailboxOrRebase => RepositoryState::ApplyMailboxOrRebase,
    }
}

/// An open libgit2 repository.
pub struct GitRepository {
    repo: Mutex<git2::Repository>,
    path: PathBuf,
    workdir: Option<PathBuf>,
    bare: bool,
}

impl GitRepository {
    fn new(repo: git2::Repository) -> Self {
        let path = repo.path().to_path_buf();
        let workdir = repo.workdir().map(Path::to_path_buf);
        let bare = repo.is_bare();
        Self {
            repo: Mutex::new(repo),
            path,
            workdir,
            bare,
        }
    }
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.path)
            .finish()
    }
}

impl Resource for GitRepository {
    const KIND: &'static str = "repository";
}

impl RepositoryResource for GitRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn is_bare(&self) -> bool {
        self.bare
    }

    fn state(&self) -> RepositoryState {
        repository_state(self.repo.lock().state())
    }
}

/// A commit looked up through libgit2.
#[derive(Debug)]
pub struct GitCommit {
    record: CommitRecord,
}

impl Resource for GitCommit {
    const KIND: &'static str = "commit";
}

impl CommitResource for GitCommit {
    fn record(&self) -> &CommitRecord {
        &self.record
    }
}

/// A reference looked up through libgit2.
#[derive(Debug)]
pub struct GitReference {
    record: ReferenceRecord,
}

impl Resource for GitReference {
    const KIND: &'static str = "reference";
}

impl ReferenceResource for GitReference {
    fn record(&self) -> &ReferenceRecord {
        &self.record
    }
}

/// The libgit2 backend.
///
/// Stateless; all state lives in the resources it returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git;

impl Git {
    pub fn new() -> Self {
        Git
    }
}

impl Backend for Git {
    type Repository = GitRepository;
    type Commit = GitCommit;
    type Reference = GitReference;

    fn open(&self, path: &Path) -> Result<GitRepository, ErrorInfo> {
        trace!(path = %path.display(), "git_repository_open");
        let repo = git2::Repository::open(path)?;
        Ok(GitRepository::new(repo))
    }

    fn open_ext(
        &self,
        path: &Path,
        flags: OpenFlags,
        ceiling_dirs: &[PathBuf],
    ) -> Result<GitRepository, ErrorInfo> {
        trace!(path = %path.display(), flags = flags.bits(), "git_repository_open_ext");
        let repo = git2::Repository::open_ext(
            path,
            git2::RepositoryOpenFlags::from_bits_truncate(flags.bits()),
            ceiling_dirs,
        )?;
        Ok(GitRepository::new(repo))
    }

    fn discover(
        &self,
        start: &Path,
        across_fs: bool,
        ceiling_dirs: &[PathBuf],
    ) -> Result<PathBuf, ErrorInfo> {
        trace!(start = %start.display(), across_fs, "git_repository_discover");
        let flags = if across_fs {
            git2::RepositoryOpenFlags::CROSS_FS
        } else {
            git2::RepositoryOpenFlags::empty()
        };
        let repo = git2::Repository::open_ext(start, flags, ceiling_dirs)?;
        Ok(repo.path().to_path_buf())
    }

    fn find_commit(&self, repo: &GitRepository, id: &ObjectId) -> Result<GitCommit, ErrorInfo> {
        let oid = to_git2_oid(id)?;
        let repo = repo.repo.lock();
        let commit = repo.find_commit(oid)?;

        let parent_ids = commit
            .parent_ids()
            .map(to_object_id)
            .collect::<Result<Vec<_>, _>>()?;

        let record = CommitRecord {
            id: to_object_id(commit.id())?,
            tree_id: to_object_id(commit.tree_id())?,
            parent_ids,
            message: lossy(commit.message_bytes()),
            summary: commit.summary_bytes().map(lossy),
            author: signature(&commit.author()),
            committer: signature(&commit.committer()),
        };
        Ok(GitCommit { record })
    }

    fn find_reference(&self, repo: &GitRepository, name: &str) -> Result<GitReference, ErrorInfo> {
        let repo = repo.repo.lock();
        let reference = repo.find_reference(name)?;

        let kind = match reference.kind() {
            Some(git2::ReferenceType::Symbolic) => ReferenceKind::Symbolic,
            _ => ReferenceKind::Direct,
        };
        let target = reference.target().map(to_object_id).transpose()?;

        let record = ReferenceRecord {
            name: lossy(reference.name_bytes()),
            shorthand: lossy(reference.shorthand_bytes()),
            kind,
            target,
            symbolic_target: reference.symbolic_target_bytes().map(lossy),
            is_branch: reference.is_branch(),
            is_remote: reference.is_remote(),
            is_tag: reference.is_tag(),
        };
        Ok(GitReference { record })
    }

    fn reference_name_to_id(&self, repo: &GitRepository, name: &str) -> Result<ObjectId, ErrorInfo> {
        let oid = repo.repo.lock().refname_to_id(name)?;
        to_object_id(oid)
    }

    fn message_prettify(&self, message: &str, comment_char: Option<u8>) -> Result<String, ErrorInfo> {
        Ok(git2::message_prettify(message, comment_char)?)
    }
}
