//! api::commit
//!
//! Commit lookup by identifier.

use crate::core::error::ErrorInfo;
use crate::core::handle::{HandleOwner, NativeHandle, Retained};
use crate::core::types::{IntoObjectId, ObjectId, TaskId};
use crate::engine::{Runtime, Task};
use crate::git::{Backend, CommitRecord, CommitResource, Git, Signature};

use super::Repository;

/// A commit looked up from a [`Repository`].
pub struct Commit<B: Backend = Git> {
    owner: HandleOwner<B::Commit>,
}

impl<B: Backend> Commit<B> {
    /// Look up a commit, blocking the calling thread.
    ///
    /// `id` may be an [`ObjectId`], a hex string or raw id bytes. A
    /// malformed id, an id length the backend cannot use, or an invalid
    /// repository wrapper is an argument error.
    pub fn lookup_sync(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        id: impl IntoObjectId,
    ) -> Result<Self, ErrorInfo> {
        rt.run_sync(LookupTask::prepare(rt.backend(), repo, id))
    }

    /// Look up a commit on the worker pool.
    pub fn lookup<F>(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        id: impl IntoObjectId,
        continuation: F,
    ) -> Result<TaskId, ErrorInfo>
    where
        F: FnOnce(Result<Self, ErrorInfo>) + 'static,
    {
        rt.submit(LookupTask::prepare(rt.backend(), repo, id), continuation)
    }

    fn record(&self) -> Result<&CommitRecord, ErrorInfo> {
        Ok(self.owner.get()?.record())
    }

    pub fn id(&self) -> Result<ObjectId, ErrorInfo> {
        Ok(self.record()?.id)
    }

    pub fn tree_id(&self) -> Result<ObjectId, ErrorInfo> {
        Ok(self.record()?.tree_id)
    }

    pub fn parent_ids(&self) -> Result<&[ObjectId], ErrorInfo> {
        Ok(&self.record()?.parent_ids)
    }

    pub fn parent_count(&self) -> Result<usize, ErrorInfo> {
        Ok(self.record()?.parent_ids.len())
    }

    /// Full commit message.
    pub fn message(&self) -> Result<&str, ErrorInfo> {
        Ok(&self.record()?.message)
    }

    /// First paragraph of the message with line breaks folded.
    pub fn summary(&self) -> Result<Option<&str>, ErrorInfo> {
        Ok(self.record()?.summary.as_deref())
    }

    pub fn author(&self) -> Result<&Signature, ErrorInfo> {
        Ok(&self.record()?.author)
    }

    pub fn committer(&self) -> Result<&Signature, ErrorInfo> {
        Ok(&self.record()?.committer)
    }

    pub fn is_valid(&self) -> bool {
        self.owner.is_valid()
    }

    /// Move the commit into a new wrapper, invalidating this one.
    pub fn transfer(&mut self) -> Result<Self, ErrorInfo> {
        Ok(Self {
            owner: self.owner.transfer()?,
        })
    }
}

impl<B: Backend> std::fmt::Debug for Commit<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commit")
            .field("id", &self.id().ok())
            .field("valid", &self.is_valid())
            .finish()
    }
}

struct LookupTask<B: Backend> {
    repo: Retained<B::Repository>,
    id: ObjectId,
}

impl<B: Backend> LookupTask<B> {
    fn prepare(
        backend: &B,
        repo: &Repository<B>,
        id: impl IntoObjectId,
    ) -> Result<Self, ErrorInfo> {
        let repo = repo.retain()?;
        let id = id.into_object_id()?;
        if !backend.supports_id_len(id.as_bytes().len()) {
            return Err(ErrorInfo::argument(format!(
                "object id {} has {} bytes, which this backend cannot look up",
                id.short(12),
                id.as_bytes().len()
            )));
        }
        Ok(Self { repo, id })
    }
}

impl<B: Backend> Task<B> for LookupTask<B> {
    type Raw = B::Commit;
    type Output = Commit<B>;

    const NAME: &'static str = "commit.lookup";

    fn execute(&self, backend: &B, output: &mut Option<B::Commit>) -> Result<(), ErrorInfo> {
        *output = Some(backend.find_commit(&self.repo, &self.id)?);
        Ok(())
    }

    fn complete(raw: B::Commit) -> Commit<B> {
        Commit {
            owner: HandleOwner::new(NativeHandle::new(raw)),
        }
    }
}
