//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use tempfile::TempDir;

use gitteh::{Config, ObjectId, Runtime};

/// Test fixture that creates a real git repository.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository on `main` with an initial commit.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    /// Create a bare repository with no commits.
    pub fn bare() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "--bare"]);
        Self { dir }
    }

    /// Working directory (or the git directory itself when bare).
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Canonical path of the `.git` directory.
    pub fn git_dir(&self) -> PathBuf {
        canonical(&self.path().join(".git"))
    }

    /// Create a file and commit it, returning the new commit id.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> ObjectId {
        std::fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
        self.head()
    }

    /// Create `count` commits on top of HEAD, returning their ids in order.
    pub fn commit_many(&self, count: usize) -> Vec<ObjectId> {
        (0..count)
            .map(|n| {
                self.commit_file(
                    &format!("file-{n}.txt"),
                    &format!("content {n}\n"),
                    &format!("Commit number {n}"),
                )
            })
            .collect()
    }

    pub fn create_branch(&self, name: &str) {
        run_git(self.path(), &["branch", name]);
    }

    pub fn create_tag(&self, name: &str) {
        run_git(self.path(), &["tag", name]);
    }

    /// HEAD id using git directly.
    pub fn head(&self) -> ObjectId {
        self.rev_parse("HEAD")
    }

    pub fn rev_parse(&self, rev: &str) -> ObjectId {
        let hex = git_stdout(self.path(), &["rev-parse", rev]).expect("git rev-parse failed");
        ObjectId::from_hex(&hex).expect("rev-parse printed a bad id")
    }
}

/// Run a git command in the given directory, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) {
    if let Err(err) = git_stdout(dir, args) {
        panic!("{err:#}");
    }
}

/// Run a git command and return its trimmed stdout.
pub fn git_stdout(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .context("failed to spawn git")?;

    anyhow::ensure!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).expect("path should exist")
}

/// A libgit2 runtime with default settings and test logging.
pub fn runtime() -> Runtime {
    gitteh::logging::init_test_writer();
    Runtime::new(&Config::default()).expect("runtime should start")
}
