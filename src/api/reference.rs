//! api::reference
//!
//! Reference lookup and name resolution.
//!
//! `lookup` returns the reference itself, symbolic or not. `resolve` follows
//! symbolic references down to the object id they finally name.

use crate::core::error::ErrorInfo;
use crate::core::handle::{HandleOwner, NativeHandle, Retained};
use crate::core::types::{ObjectId, TaskId};
use crate::engine::{Runtime, Task};
use crate::git::{Backend, Git, ReferenceKind, ReferenceRecord, ReferenceResource};

use super::Repository;

/// A reference looked up from a [`Repository`].
pub struct Reference<B: Backend = Git> {
    owner: HandleOwner<B::Reference>,
}

impl<B: Backend> Reference<B> {
    /// Look up a reference by full name, blocking the calling thread.
    pub fn lookup_sync(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        name: &str,
    ) -> Result<Self, ErrorInfo> {
        rt.run_sync(LookupTask::prepare(repo, name))
    }

    /// Look up a reference on the worker pool.
    pub fn lookup<F>(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        name: &str,
        continuation: F,
    ) -> Result<TaskId, ErrorInfo>
    where
        F: FnOnce(Result<Self, ErrorInfo>) + 'static,
    {
        rt.submit(LookupTask::prepare(repo, name), continuation)
    }

    /// Resolve a reference name to the id it ultimately points at.
    pub fn resolve_sync(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        name: &str,
    ) -> Result<ObjectId, ErrorInfo> {
        rt.run_sync(ResolveTask::prepare(repo, name))
    }

    /// Non-blocking form of [`resolve_sync`](Self::resolve_sync).
    pub fn resolve<F>(
        rt: &Runtime<B>,
        repo: &Repository<B>,
        name: &str,
        continuation: F,
    ) -> Result<TaskId, ErrorInfo>
    where
        F: FnOnce(Result<ObjectId, ErrorInfo>) + 'static,
    {
        rt.submit(ResolveTask::prepare(repo, name), continuation)
    }

    fn record(&self) -> Result<&ReferenceRecord, ErrorInfo> {
        Ok(self.owner.get()?.record())
    }

    /// Full name, e.g. `refs/heads/main`.
    pub fn name(&self) -> Result<&str, ErrorInfo> {
        Ok(&self.record()?.name)
    }

    /// Human-readable short name, e.g. `main`.
    pub fn shorthand(&self) -> Result<&str, ErrorInfo> {
        Ok(&self.record()?.shorthand)
    }

    pub fn kind(&self) -> Result<ReferenceKind, ErrorInfo> {
        Ok(self.record()?.kind)
    }

    /// Whether this is a local branch (`refs/heads/`).
    pub fn is_branch(&self) -> Result<bool, ErrorInfo> {
        Ok(self.record()?.is_branch)
    }

    pub fn is_remote(&self) -> Result<bool, ErrorInfo> {
        Ok(self.record()?.is_remote)
    }

    pub fn is_tag(&self) -> Result<bool, ErrorInfo> {
        Ok(self.record()?.is_tag)
    }

    /// Target id of a direct reference.
    pub fn target(&self) -> Result<Option<ObjectId>, ErrorInfo> {
        Ok(self.record()?.target)
    }

    /// Target name of a symbolic reference.
    pub fn symbolic_target(&self) -> Result<Option<&str>, ErrorInfo> {
        Ok(self.record()?.symbolic_target.as_deref())
    }

    pub fn is_valid(&self) -> bool {
        self.owner.is_valid()
    }

    /// Move the reference into a new wrapper, invalidating this one.
    pub fn transfer(&mut self) -> Result<Self, ErrorInfo> {
        Ok(Self {
            owner: self.owner.transfer()?,
        })
    }
}

impl<B: Backend> std::fmt::Debug for Reference<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reference")
            .field("name", &self.name().ok())
            .field("valid", &self.is_valid())
            .finish()
    }
}

struct LookupTask<B: Backend> {
    repo: Retained<B::Repository>,
    name: String,
}

impl<B: Backend> LookupTask<B> {
    fn prepare(repo: &Repository<B>, name: &str) -> Result<Self, ErrorInfo> {
        Ok(Self {
            repo: repo.retain()?,
            name: name.to_string(),
        })
    }
}

impl<B: Backend> Task<B> for LookupTask<B> {
    type Raw = B::Reference;
    type Output = Reference<B>;

    const NAME: &'static str = "reference.lookup";

    fn execute(&self, backend: &B, output: &mut Option<B::Reference>) -> Result<(), ErrorInfo> {
        *output = Some(backend.find_reference(&self.repo, &self.name)?);
        Ok(())
    }

    fn complete(raw: B::Reference) -> Reference<B> {
        Reference {
            owner: HandleOwner::new(NativeHandle::new(raw)),
        }
    }
}

struct ResolveTask<B: Backend> {
    repo: Retained<B::Repository>,
    name: String,
}

impl<B: Backend> ResolveTask<B> {
    fn prepare(repo: &Repository<B>, name: &str) -> Result<Self, ErrorInfo> {
        Ok(Self {
            repo: repo.retain()?,
            name: name.to_string(),
        })
    }
}

impl<B: Backend> Task<B> for ResolveTask<B> {
    type Raw = ObjectId;
    type Output = ObjectId;

    const NAME: &'static str = "reference.resolve";

    fn execute(&self, backend: &B, output: &mut Option<ObjectId>) -> Result<(), ErrorInfo> {
        *output = Some(backend.reference_name_to_id(&self.repo, &self.name)?);
        Ok(())
    }

    fn complete(raw: ObjectId) -> ObjectId {
        raw
    }
}
