//! In-memory backend for unit tests.
//!
//! Counts resource frees and can delay individual commit lookups so tests
//! can force completions out of submission order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::error::ErrorInfo;
use crate::core::handle::{HandleOwner, NativeHandle, Resource, Retained};
use crate::core::types::ObjectId;
use crate::engine::{Runtime, Task};
use crate::git::{
    Backend, CommitRecord, CommitResource, OpenFlags, ReferenceKind, ReferenceRecord,
    ReferenceResource, RepositoryResource, RepositoryState, Signature,
};

const NOT_FOUND: i32 = -3;
const INVALID_SPEC: i32 = -12;
const CLASS_REFERENCE: i32 = 4;
const CLASS_REPOSITORY: i32 = 6;
const CLASS_OBJECT: i32 = 11;

/// Runtime over `backend` with default settings.
pub(crate) fn runtime(backend: MockBackend) -> Runtime<MockBackend> {
    Runtime::with_backend(backend, &Config::default()).unwrap()
}

/// A 20-byte id filled with `n`.
pub(crate) fn oid(n: u8) -> ObjectId {
    ObjectId::from_bytes(&[n; 20]).unwrap()
}

pub(crate) struct MockRepository {
    path: PathBuf,
    frees: Arc<AtomicUsize>,
}

impl Resource for MockRepository {
    const KIND: &'static str = "repository";
}

impl RepositoryResource for MockRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn workdir(&self) -> Option<&Path> {
        self.path.parent()
    }

    fn is_bare(&self) -> bool {
        false
    }

    fn state(&self) -> RepositoryState {
        RepositoryState::None
    }
}

impl Drop for MockRepository {
    fn drop(&mut self) {
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockCommit {
    record: CommitRecord,
    frees: Arc<AtomicUsize>,
}

impl Resource for MockCommit {
    const KIND: &'static str = "commit";
}

impl CommitResource for MockCommit {
    fn record(&self) -> &CommitRecord {
        &self.record
    }
}

impl Drop for MockCommit {
    fn drop(&mut self) {
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockReference {
    record: ReferenceRecord,
    frees: Arc<AtomicUsize>,
}

impl Resource for MockReference {
    const KIND: &'static str = "reference";
}

impl ReferenceResource for MockReference {
    fn record(&self) -> &ReferenceRecord {
        &self.record
    }
}

impl Drop for MockReference {
    fn drop(&mut self) {
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

struct StoredCommit {
    message: String,
    delay: Duration,
}

enum StoredRef {
    Direct(ObjectId),
    Symbolic(String),
}

#[derive(Default)]
pub(crate) struct MockBackend {
    repositories: HashSet<PathBuf>,
    commits: HashMap<ObjectId, StoredCommit>,
    references: HashMap<String, StoredRef>,
    frees: Arc<AtomicUsize>,
    lookups: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.repositories.insert(path.into());
        self
    }

    pub(crate) fn with_commit(mut self, id: ObjectId, message: &str, delay: Duration) -> Self {
        self.commits.insert(
            id,
            StoredCommit {
                message: message.to_string(),
                delay,
            },
        );
        self
    }

    pub(crate) fn with_direct_ref(mut self, name: &str, id: ObjectId) -> Self {
        self.references
            .insert(name.to_string(), StoredRef::Direct(id));
        self
    }

    pub(crate) fn with_symbolic_ref(mut self, name: &str, target: &str) -> Self {
        self.references
            .insert(name.to_string(), StoredRef::Symbolic(target.to_string()));
        self
    }

    /// Resources freed so far, across every kind.
    pub(crate) fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Commit lookups performed so far.
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// An owner built directly, without going through a task.
    pub(crate) fn repository_owner(&self, path: &str) -> HandleOwner<MockRepository> {
        HandleOwner::new(NativeHandle::new(self.repository(Path::new(path))))
    }

    fn repository(&self, path: &Path) -> MockRepository {
        MockRepository {
            path: path.to_path_buf(),
            frees: Arc::clone(&self.frees),
        }
    }

    fn search(&self, start: &Path, ceiling_dirs: &[PathBuf]) -> Option<PathBuf> {
        for dir in start.ancestors() {
            if dir != start && ceiling_dirs.iter().any(|c| c == dir) {
                return None;
            }
            if self.repositories.contains(dir) {
                return Some(dir.to_path_buf());
            }
        }
        None
    }

    fn check_ref_name(name: &str) -> Result<(), ErrorInfo> {
        if (name == "HEAD" || name.starts_with("refs/")) && !name.contains("..") {
            return Ok(());
        }
        Err(ErrorInfo::from_status(
            INVALID_SPEC,
            CLASS_REFERENCE,
            format!("the given reference name '{}' is not valid", name),
        ))
    }

    fn missing_ref(name: &str) -> ErrorInfo {
        ErrorInfo::from_status(
            NOT_FOUND,
            CLASS_REFERENCE,
            format!("reference '{}' not found", name),
        )
    }

    fn missing_repo(path: &Path) -> ErrorInfo {
        ErrorInfo::from_status(
            NOT_FOUND,
            CLASS_REPOSITORY,
            format!("could not find repository at '{}'", path.display()),
        )
    }
}

fn shorthand(name: &str) -> String {
    ["refs/heads/", "refs/remotes/", "refs/tags/", "refs/"]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
        .to_string()
}

impl Backend for MockBackend {
    type Repository = MockRepository;
    type Commit = MockCommit;
    type Reference = MockReference;

    fn open(&self, path: &Path) -> Result<MockRepository, ErrorInfo> {
        if self.repositories.contains(path) {
            Ok(self.repository(path))
        } else {
            Err(Self::missing_repo(path))
        }
    }

    fn open_ext(
        &self,
        path: &Path,
        flags: OpenFlags,
        ceiling_dirs: &[PathBuf],
    ) -> Result<MockRepository, ErrorInfo> {
        if flags.contains(OpenFlags::NO_SEARCH) {
            return self.open(path);
        }
        self.search(path, ceiling_dirs)
            .map(|found| self.repository(&found))
            .ok_or_else(|| Self::missing_repo(path))
    }

    fn discover(
        &self,
        start: &Path,
        _across_fs: bool,
        ceiling_dirs: &[PathBuf],
    ) -> Result<PathBuf, ErrorInfo> {
        self.search(start, ceiling_dirs)
            .map(|found| found.join(".git"))
            .ok_or_else(|| Self::missing_repo(start))
    }

    fn find_commit(&self, _repo: &MockRepository, id: &ObjectId) -> Result<MockCommit, ErrorInfo> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let stored = self.commits.get(id).ok_or_else(|| {
            ErrorInfo::from_status(
                NOT_FOUND,
                CLASS_OBJECT,
                format!("object not found - no match for id ({})", id),
            )
        })?;
        if !stored.delay.is_zero() {
            thread::sleep(stored.delay);
        }

        let signature = Signature {
            name: "Mock".to_string(),
            email: "mock@example.com".to_string(),
            when: chrono::DateTime::from_timestamp(0, 0).unwrap_or_default(),
            offset_minutes: 0,
        };
        Ok(MockCommit {
            record: CommitRecord {
                id: *id,
                tree_id: ObjectId::zero(),
                parent_ids: Vec::new(),
                message: stored.message.clone(),
                summary: stored.message.lines().next().map(str::to_string),
                author: signature.clone(),
                committer: signature,
            },
            frees: Arc::clone(&self.frees),
        })
    }

    fn find_reference(
        &self,
        _repo: &MockRepository,
        name: &str,
    ) -> Result<MockReference, ErrorInfo> {
        Self::check_ref_name(name)?;
        let stored = self
            .references
            .get(name)
            .ok_or_else(|| Self::missing_ref(name))?;

        let (kind, target, symbolic_target) = match stored {
            StoredRef::Direct(id) => (ReferenceKind::Direct, Some(*id), None),
            StoredRef::Symbolic(to) => (ReferenceKind::Symbolic, None, Some(to.clone())),
        };
        Ok(MockReference {
            record: ReferenceRecord {
                name: name.to_string(),
                shorthand: shorthand(name),
                kind,
                target,
                symbolic_target,
                is_branch: name.starts_with("refs/heads/"),
                is_remote: name.starts_with("refs/remotes/"),
                is_tag: name.starts_with("refs/tags/"),
            },
            frees: Arc::clone(&self.frees),
        })
    }

    fn reference_name_to_id(&self, _repo: &MockRepository, name: &str) -> Result<ObjectId, ErrorInfo> {
        Self::check_ref_name(name)?;
        let mut current = name.to_string();
        for _ in 0..5 {
            match self.references.get(&current) {
                Some(StoredRef::Direct(id)) => return Ok(*id),
                Some(StoredRef::Symbolic(to)) => current = to.clone(),
                None => return Err(Self::missing_ref(&current)),
            }
        }
        Err(Self::missing_ref(name))
    }

    fn message_prettify(&self, message: &str, comment_char: Option<u8>) -> Result<String, ErrorInfo> {
        let mut out = String::new();
        let mut blank = false;
        for line in message.lines() {
            if comment_char.is_some_and(|c| line.as_bytes().first() == Some(&c)) {
                continue;
            }
            let line = line.trim_end();
            if line.is_empty() {
                blank = !out.is_empty();
                continue;
            }
            if blank {
                out.push('\n');
                blank = false;
            }
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }
}

/// A task with scripted behavior.
pub(crate) enum Probe {
    Value(u32),
    Fail(ErrorInfo),
    Nothing,
    Panic,
    Retaining(Retained<MockRepository>),
    Sleep(Duration, u32),
}

impl Task<MockBackend> for Probe {
    type Raw = u32;
    type Output = u32;

    const NAME: &'static str = "probe";

    fn execute(&self, _backend: &MockBackend, output: &mut Option<u32>) -> Result<(), ErrorInfo> {
        match self {
            Probe::Value(value) => *output = Some(*value),
            Probe::Fail(err) => return Err(err.clone()),
            Probe::Nothing => {}
            Probe::Panic => panic!("probe asked to panic"),
            Probe::Retaining(repo) => *output = Some(repo.path().as_os_str().len() as u32),
            Probe::Sleep(delay, value) => {
                thread::sleep(*delay);
                *output = Some(*value);
            }
        }
        Ok(())
    }

    fn complete(raw: u32) -> u32 {
        raw
    }
}
