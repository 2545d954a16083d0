//! api::repository
//!
//! Opening and discovering repositories.
//!
//! # Variants
//!
//! | Blocking | Non-blocking | Result |
//! |---|---|---|
//! | [`Repository::open_sync`] | [`Repository::open`] | `Repository` |
//! | [`Repository::discover_sync`] | [`Repository::discover`] | git directory path |
//!
//! Without [`OpenOptions`], `open` opens exactly the given path. With them,
//! the extended open runs, which searches parent directories unless
//! [`OpenFlags::NO_SEARCH`](crate::git::OpenFlags::NO_SEARCH) is set.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::core::error::ErrorInfo;
use crate::core::handle::{HandleOwner, NativeHandle, Retained};
use crate::core::types::TaskId;
use crate::engine::{Runtime, Task};
use crate::git::{Backend, Git, OpenOptions, RepositoryResource, RepositoryState};

/// An open repository.
///
/// Lives on the host thread. Tasks that read it hold their own retain, so
/// dropping it while a lookup is in flight is safe.
pub struct Repository<B: Backend = Git> {
    owner: HandleOwner<B::Repository>,
}

impl<B: Backend> Repository<B> {
    fn wrap(handle: NativeHandle<B::Repository>) -> Self {
        Self {
            owner: HandleOwner::new(handle),
        }
    }

    /// Open a repository, blocking the calling thread.
    pub fn open_sync(
        rt: &Runtime<B>,
        path: impl AsRef<Path>,
        options: Option<OpenOptions>,
    ) -> Result<Self, ErrorInfo> {
        rt.run_sync(OpenTask::prepare(path.as_ref(), options))
    }

    /// Open a repository on the worker pool.
    pub fn open<F>(
        rt: &Runtime<B>,
        path: impl AsRef<Path>,
        options: Option<OpenOptions>,
        continuation: F,
    ) -> Result<TaskId, ErrorInfo>
    where
        F: FnOnce(Result<Self, ErrorInfo>) + 'static,
    {
        rt.submit(OpenTask::prepare(path.as_ref(), options), continuation)
    }

    /// Find the git directory of the repository containing `start`,
    /// blocking the calling thread.
    ///
    /// The search stops at filesystem boundaries unless `across_fs` is set,
    /// and never climbs above any of `ceiling_dirs`.
    pub fn discover_sync(
        rt: &Runtime<B>,
        start: impl AsRef<Path>,
        across_fs: bool,
        ceiling_dirs: &[PathBuf],
    ) -> Result<PathBuf, ErrorInfo> {
        rt.run_sync(DiscoverTask::prepare(start.as_ref(), across_fs, ceiling_dirs))
    }

    /// Non-blocking form of [`discover_sync`](Self::discover_sync).
    pub fn discover<F>(
        rt: &Runtime<B>,
        start: impl AsRef<Path>,
        across_fs: bool,
        ceiling_dirs: &[PathBuf],
        continuation: F,
    ) -> Result<TaskId, ErrorInfo>
    where
        F: FnOnce(Result<PathBuf, ErrorInfo>) + 'static,
    {
        rt.submit(
            DiscoverTask::prepare(start.as_ref(), across_fs, ceiling_dirs),
            continuation,
        )
    }

    /// Path to the git directory.
    pub fn path(&self) -> Result<&Path, ErrorInfo> {
        Ok(self.owner.get()?.path())
    }

    /// Working directory, `None` for bare repositories.
    pub fn workdir(&self) -> Result<Option<&Path>, ErrorInfo> {
        Ok(self.owner.get()?.workdir())
    }

    pub fn is_bare(&self) -> Result<bool, ErrorInfo> {
        Ok(self.owner.get()?.is_bare())
    }

    /// Operation in progress (merge, rebase, ...), if any.
    pub fn state(&self) -> Result<RepositoryState, ErrorInfo> {
        Ok(self.owner.get()?.state())
    }

    pub fn is_valid(&self) -> bool {
        self.owner.is_valid()
    }

    /// Move the underlying repository into a new wrapper.
    ///
    /// `self` becomes invalid: its accessors fail and dropping it frees
    /// nothing.
    pub fn transfer(&mut self) -> Result<Self, ErrorInfo> {
        Ok(Self {
            owner: self.owner.transfer()?,
        })
    }

    /// Counted reference for a task reading this repository.
    pub(crate) fn retain(&self) -> Result<Retained<B::Repository>, ErrorInfo> {
        self.owner.retain()
    }

    /// Number of in-flight tasks holding this repository.
    pub fn retain_count(&self) -> usize {
        self.owner.retain_count()
    }
}

impl<B: Backend> std::fmt::Debug for Repository<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.owner.get().map(|r| r.path()).ok())
            .field("valid", &self.is_valid())
            .finish()
    }
}

struct OpenTask<B> {
    path: PathBuf,
    options: Option<OpenOptions>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: Backend> OpenTask<B> {
    fn prepare(path: &Path, options: Option<OpenOptions>) -> Result<Self, ErrorInfo> {
        Ok(Self {
            path: path.to_path_buf(),
            options,
            _backend: PhantomData,
        })
    }
}

impl<B: Backend> Task<B> for OpenTask<B> {
    type Raw = B::Repository;
    type Output = Repository<B>;

    const NAME: &'static str = "repository.open";

    fn execute(&self, backend: &B, output: &mut Option<B::Repository>) -> Result<(), ErrorInfo> {
        let repo = match &self.options {
            Some(options) => backend.open_ext(&self.path, options.flags, &options.ceiling_dirs)?,
            None => backend.open(&self.path)?,
        };
        *output = Some(repo);
        Ok(())
    }

    fn complete(raw: B::Repository) -> Repository<B> {
        Repository::wrap(NativeHandle::new(raw))
    }
}

struct DiscoverTask<B> {
    start: PathBuf,
    across_fs: bool,
    ceiling_dirs: Vec<PathBuf>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: Backend> DiscoverTask<B> {
    fn prepare(start: &Path, across_fs: bool, ceiling_dirs: &[PathBuf]) -> Result<Self, ErrorInfo> {
        Ok(Self {
            start: start.to_path_buf(),
            across_fs,
            ceiling_dirs: ceiling_dirs.to_vec(),
            _backend: PhantomData,
        })
    }
}

impl<B: Backend> Task<B> for DiscoverTask<B> {
    type Raw = PathBuf;
    type Output = PathBuf;

    const NAME: &'static str = "repository.discover";

    fn execute(&self, backend: &B, output: &mut Option<PathBuf>) -> Result<(), ErrorInfo> {
        *output = Some(backend.discover(&self.start, self.across_fs, &self.ceiling_dirs)?);
        Ok(())
    }

    fn complete(raw: PathBuf) -> PathBuf {
        raw
    }
}
