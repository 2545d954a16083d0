//! Integration tests for opening and discovering repositories.
//!
//! These run against real repositories built with the git CLI.

mod common;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use common::{canonical, runtime, TestRepo};
use gitteh::git::RepositoryState;
use gitteh::{ErrorCategory, ErrorInfo, OpenFlags, OpenOptions, Repository};

// =============================================================================
// Open
// =============================================================================

#[test]
fn open_sync_valid_repository() {
    let fixture = TestRepo::new();
    let rt = runtime();

    let repo = Repository::open_sync(&rt, fixture.path(), None).unwrap();
    assert_eq!(canonical(repo.path().unwrap()), fixture.git_dir());
    assert_eq!(
        canonical(repo.workdir().unwrap().unwrap()),
        canonical(fixture.path())
    );
    assert!(!repo.is_bare().unwrap());
    assert_eq!(repo.state().unwrap(), RepositoryState::None);
}

#[test]
fn open_async_valid_repository() {
    let fixture = TestRepo::new();
    let rt = runtime();
    let opened = Rc::new(RefCell::new(Vec::new()));

    let seen = Rc::clone(&opened);
    Repository::open(&rt, fixture.path(), None, move |result| {
        seen.borrow_mut().push(result);
    })
    .unwrap();

    assert!(opened.borrow().is_empty());
    rt.run_until_idle();

    let opened = opened.borrow();
    assert_eq!(opened.len(), 1);
    let repo = opened[0].as_ref().unwrap();
    assert_eq!(canonical(repo.path().unwrap()), fixture.git_dir());
}

#[test]
fn open_bare_repository() {
    let fixture = TestRepo::bare();
    let rt = runtime();

    let repo = Repository::open_sync(&rt, fixture.path(), None).unwrap();
    assert!(repo.is_bare().unwrap());
    assert!(repo.workdir().unwrap().is_none());
}

#[test]
fn open_nonexistent_is_not_found_in_both_variants() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let rt = runtime();

    let err = Repository::open_sync(&rt, &missing, None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let delivered: Rc<RefCell<Vec<ErrorInfo>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&delivered);
    Repository::open(&rt, &missing, None, move |result| {
        seen.borrow_mut().push(result.unwrap_err());
    })
    .unwrap();
    rt.run_until_idle();

    let delivered = delivered.borrow();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].category(), ErrorCategory::NotFound);
}

#[test]
fn open_plain_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let rt = runtime();

    let err = Repository::open_sync(&rt, dir.path(), None).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.message.is_empty());
}

#[test]
fn open_subdirectory_needs_search() {
    let fixture = TestRepo::new();
    let subdir = fixture.path().join("nested/deeper");
    std::fs::create_dir_all(&subdir).unwrap();
    let rt = runtime();

    assert!(Repository::open_sync(&rt, &subdir, None).is_err());

    let repo = Repository::open_sync(&rt, &subdir, Some(OpenOptions::new())).unwrap();
    assert_eq!(canonical(repo.path().unwrap()), fixture.git_dir());

    let no_search = OpenOptions::new().flags(OpenFlags::NO_SEARCH);
    assert!(Repository::open_sync(&rt, &subdir, Some(no_search)).is_err());
}

#[test]
fn open_respects_ceiling_dirs() {
    let fixture = TestRepo::new();
    let subdir = fixture.path().join("a/b");
    std::fs::create_dir_all(&subdir).unwrap();
    let rt = runtime();

    let options = OpenOptions::new().ceiling_dir(canonical(&fixture.path().join("a")));
    let err = Repository::open_sync(&rt, canonical(&subdir), Some(options)).unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Discover
// =============================================================================

#[test]
fn discover_from_subdirectory() {
    let fixture = TestRepo::new();
    let subdir = fixture.path().join("src/module");
    std::fs::create_dir_all(&subdir).unwrap();
    let rt = runtime();

    let found = Repository::discover_sync(&rt, &subdir, false, &[]).unwrap();
    assert_eq!(canonical(&found), fixture.git_dir());
}

#[test]
fn discover_async() {
    let fixture = TestRepo::new();
    let rt = runtime();
    let found: Rc<RefCell<Option<PathBuf>>> = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&found);
    Repository::discover(&rt, fixture.path(), true, &[], move |result| {
        *slot.borrow_mut() = Some(result.unwrap());
    })
    .unwrap();
    rt.run_until_idle();

    let found = found.borrow_mut().take().unwrap();
    assert_eq!(canonical(&found), fixture.git_dir());
}

#[test]
fn discover_outside_any_repository_fails() {
    let dir = TempDir::new().unwrap();
    let rt = runtime();

    let ceiling = vec![canonical(dir.path())];
    let err = Repository::discover_sync(&rt, canonical(dir.path()), false, &ceiling).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn discover_stops_at_ceiling() {
    let fixture = TestRepo::new();
    let subdir = fixture.path().join("x/y");
    std::fs::create_dir_all(&subdir).unwrap();
    let rt = runtime();

    let ceiling = vec![canonical(&fixture.path().join("x"))];
    let err = Repository::discover_sync(&rt, canonical(&subdir), false, &ceiling).unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn transferred_repository_is_invalid() {
    let fixture = TestRepo::new();
    let rt = runtime();

    let mut original = Repository::open_sync(&rt, fixture.path(), None).unwrap();
    let moved = original.transfer().unwrap();

    assert!(!original.is_valid());
    let err = original.path().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Argument);
    assert!(moved.is_valid());
    assert_eq!(canonical(moved.path().unwrap()), fixture.git_dir());
}
