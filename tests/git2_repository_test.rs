use std::fs;
use std::path::Path;

use git2::Repository as Git2Repo;
use tempfile::TempDir;

use mdrelease::changelog;
use mdrelease::cli::{run_release, ReleaseSettings};
use mdrelease::domain::ActionSet;
use mdrelease::git::{ops, Git2Repository, Repository};

/// A working repository with an `origin` remote pointing at a local bare
/// repository. The initial commit is already pushed.
struct Fixture {
    _remote_dir: TempDir,
    remote_url: String,
    work_dir: TempDir,
    repo: Git2Repository,
}

fn configure_identity(repo: &Git2Repo) {
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Release Bot").unwrap();
    config.set_str("user.email", "release@example.com").unwrap();
}

fn open(path: &Path) -> Git2Repo {
    Git2Repo::open(path).unwrap()
}

fn head_oid(path: &Path) -> git2::Oid {
    open(path).head().unwrap().target().unwrap()
}

fn remote_has_ref(url: &str, name: &str) -> bool {
    open(Path::new(url)).find_reference(name).is_ok()
}

fn commit_file(repo: &Git2Repository, dir: &Path, file: &str, content: &str, title: &str) {
    fs::write(dir.join(file), content).unwrap();
    repo.stage_all_changes().unwrap();
    repo.commit(title, "").unwrap();
}

fn setup() -> Fixture {
    let remote_dir = TempDir::new().unwrap();
    Git2Repo::init_bare(remote_dir.path()).unwrap();
    let remote_url = remote_dir.path().to_str().unwrap().to_string();

    let work_dir = TempDir::new().unwrap();
    let raw = Git2Repo::init(work_dir.path()).unwrap();
    configure_identity(&raw);
    raw.remote("origin", &remote_url).unwrap();

    let repo = Git2Repository::from_git2(raw);
    commit_file(&repo, work_dir.path(), "README.md", "hello\n", "Initial commit");
    repo.push_head("origin").unwrap();

    Fixture {
        _remote_dir: remote_dir,
        remote_url,
        work_dir,
        repo,
    }
}

/// Second working copy of the same remote, used to publish concurrent work.
fn clone_of(fixture: &Fixture) -> (TempDir, Git2Repository) {
    let dir = TempDir::new().unwrap();
    let raw = Git2Repo::clone(&fixture.remote_url, dir.path()).unwrap();
    configure_identity(&raw);
    (dir, Git2Repository::from_git2(raw))
}

#[test]
fn test_ensure_repository() {
    let fixture = setup();
    assert!(fixture.repo.ensure_repository().is_ok());

    let bare = Git2Repository::from_git2(open(Path::new(&fixture.remote_url)));
    let err = bare.ensure_repository().unwrap_err();
    assert_eq!(err.op, ops::VALIDATE_REPOSITORY);
}

#[test]
fn test_discover_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    match Git2Repository::discover(dir.path()) {
        Ok(_) => panic!("discovered a repository in an empty directory"),
        Err(err) => assert_eq!(err.op, ops::VALIDATE_REPOSITORY),
    }
}

#[test]
fn test_ensure_remote() {
    let fixture = setup();
    assert!(fixture.repo.ensure_remote("origin").is_ok());

    let err = fixture.repo.ensure_remote("upstream").unwrap_err();
    assert_eq!(err.op, ops::VALIDATE_REMOTE);
    assert!(err.message.contains("git remote add upstream <url>"));
}

#[test]
fn test_stage_and_commit() {
    let fixture = setup();
    let dir = fixture.work_dir.path();

    fs::write(dir.join("changelog.md"), "# 1.0.0 - First\n- Item\n").unwrap();
    assert!(!fixture.repo.has_staged_changes().unwrap());

    fixture.repo.stage_all_changes().unwrap();
    assert!(fixture.repo.has_staged_changes().unwrap());

    fixture.repo.commit("First", "- Item").unwrap();
    assert!(!fixture.repo.has_staged_changes().unwrap());

    let raw = open(dir);
    let head = raw.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("First\n\n- Item"));
    assert_eq!(head.parent_count(), 1);
}

#[test]
fn test_stage_picks_up_deleted_files() {
    let fixture = setup();
    fs::remove_file(fixture.work_dir.path().join("README.md")).unwrap();

    fixture.repo.stage_all_changes().unwrap();
    assert!(fixture.repo.has_staged_changes().unwrap());
}

#[test]
fn test_annotated_tag_lifecycle() {
    let fixture = setup();
    let repo = &fixture.repo;

    assert!(!repo.tag_exists_locally("v1.0.0").unwrap());
    assert!(repo.assert_tag_absent("v1.0.0").is_ok());
    assert_eq!(
        repo.assert_tag_present("v1.0.0").unwrap_err().op,
        ops::VALIDATE_LOCAL_TAG
    );

    repo.create_annotated_tag("v1.0.0", "First", "- Item").unwrap();
    assert!(repo.tag_exists_locally("v1.0.0").unwrap());
    assert_eq!(
        repo.assert_tag_absent("v1.0.0").unwrap_err().op,
        ops::VALIDATE_TAG_ABSENCE
    );

    let raw = open(fixture.work_dir.path());
    let tag = raw
        .find_reference("refs/tags/v1.0.0")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert!(tag.message().unwrap().starts_with("First\n\n- Item"));
    assert_eq!(tag.target_id(), head_oid(fixture.work_dir.path()));

    // creating it twice is refused
    assert_eq!(
        repo.create_annotated_tag("v1.0.0", "First", "").unwrap_err().op,
        ops::CREATE_TAG
    );

    repo.delete_local_tag("v1.0.0").unwrap();
    assert!(!repo.tag_exists_locally("v1.0.0").unwrap());
}

#[test]
fn test_invalid_tag_name_is_rejected() {
    let fixture = setup();

    let err = fixture.repo.tag_exists_locally("bad..name").unwrap_err();
    assert_eq!(err.op, ops::CHECK_LOCAL_TAG);
    assert!(err.message.contains("invalid ref name"));
}

#[test]
fn test_push_and_delete_remote_tag() {
    let fixture = setup();
    let repo = &fixture.repo;

    repo.create_annotated_tag("v1.0.0", "First", "").unwrap();
    assert!(!repo.tag_exists_on_remote("origin", "v1.0.0").unwrap());

    repo.push_tag("origin", "v1.0.0").unwrap();
    assert!(repo.tag_exists_on_remote("origin", "v1.0.0").unwrap());
    assert!(remote_has_ref(&fixture.remote_url, "refs/tags/v1.0.0"));

    repo.delete_remote_tag("origin", "v1.0.0").unwrap();
    assert!(!repo.tag_exists_on_remote("origin", "v1.0.0").unwrap());
    assert!(repo.tag_exists_locally("v1.0.0").unwrap());
}

#[test]
fn test_push_missing_tag_fails() {
    let fixture = setup();

    let err = fixture.repo.push_tag("origin", "v9.9.9").unwrap_err();
    assert_eq!(err.op, ops::PUSH_TAG);
}

#[test]
fn test_push_head_updates_remote_branch() {
    let fixture = setup();
    let dir = fixture.work_dir.path();

    commit_file(&fixture.repo, dir, "a.txt", "a\n", "Add a");
    fixture.repo.push_head("origin").unwrap();

    let raw = open(dir);
    let branch = raw.head().unwrap().shorthand().unwrap().to_string();
    let remote = open(Path::new(&fixture.remote_url));
    let remote_oid = remote
        .find_reference(&format!("refs/heads/{}", branch))
        .unwrap()
        .target()
        .unwrap();
    assert_eq!(remote_oid, head_oid(dir));
}

#[test]
fn test_fetch_and_fast_forward() {
    let fixture = setup();
    let (other_dir, other) = clone_of(&fixture);

    commit_file(&other, other_dir.path(), "b.txt", "b\n", "Add b");
    other.push_head("origin").unwrap();

    fixture.repo.fetch_remote_refs("origin").unwrap();
    fixture.repo.fast_forward_pull("origin").unwrap();

    assert_eq!(head_oid(fixture.work_dir.path()), head_oid(other_dir.path()));
    assert!(fixture.work_dir.path().join("b.txt").exists());
}

#[test]
fn test_fast_forward_when_ahead_is_noop() {
    let fixture = setup();
    let dir = fixture.work_dir.path();

    commit_file(&fixture.repo, dir, "local.txt", "local\n", "Local only");
    let before = head_oid(dir);

    fixture.repo.fetch_remote_refs("origin").unwrap();
    fixture.repo.fast_forward_pull("origin").unwrap();
    assert_eq!(head_oid(dir), before);
}

#[test]
fn test_diverged_branches_cannot_fast_forward() {
    let fixture = setup();
    let (other_dir, other) = clone_of(&fixture);

    commit_file(&other, other_dir.path(), "b.txt", "b\n", "Remote work");
    other.push_head("origin").unwrap();
    commit_file(
        &fixture.repo,
        fixture.work_dir.path(),
        "c.txt",
        "c\n",
        "Local work",
    );

    fixture.repo.fetch_remote_refs("origin").unwrap();
    let err = fixture.repo.fast_forward_pull("origin").unwrap_err();
    assert_eq!(err.op, ops::PULL_FAST_FORWARD);
    assert!(err.message.contains("diverged"));
}

#[test]
fn test_fetch_keeps_unpushed_local_tags() {
    let fixture = setup();

    fixture
        .repo
        .create_annotated_tag("v1.0.0", "Not pushed yet", "")
        .unwrap();
    fixture.repo.fetch_remote_refs("origin").unwrap();

    assert!(fixture.repo.tag_exists_locally("v1.0.0").unwrap());
}

#[test]
fn test_fetch_remote_tags_brings_published_tags() {
    let fixture = setup();
    let (_other_dir, other) = clone_of(&fixture);

    other.create_annotated_tag("v0.9.0", "Published elsewhere", "").unwrap();
    other.push_tag("origin", "v0.9.0").unwrap();

    assert!(!fixture.repo.tag_exists_locally("v0.9.0").unwrap());
    fixture.repo.fetch_remote_tags().unwrap();
    assert!(fixture.repo.tag_exists_locally("v0.9.0").unwrap());
}

#[test]
fn test_full_release_against_real_repository() {
    let fixture = setup();
    let dir = fixture.work_dir.path();
    let changelog_path = dir.join("changelog.md");
    fs::write(
        &changelog_path,
        "# 1.1.0 - Faster startup\n- Cache the index\n- Drop unused flag\n",
    )
    .unwrap();

    let entry = changelog::parse_latest(&changelog_path).unwrap();
    let settings = ReleaseSettings {
        changelog_path: changelog_path.to_string_lossy().to_string(),
        ..ReleaseSettings::default()
    };

    let outcome = run_release(&fixture.repo, &entry, ActionSet::full(), &settings).unwrap();
    assert!(outcome.tag_created);

    let raw = open(dir);
    let head = raw.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(
        head.message(),
        Some("Faster startup\n\n- Cache the index\n- Drop unused flag")
    );
    assert!(remote_has_ref(&fixture.remote_url, "refs/tags/v1.1.0"));

    // the same entry cannot be released twice
    let err = run_release(&fixture.repo, &entry, ActionSet::full(), &settings).unwrap_err();
    assert_eq!(err.exit_code(), mdrelease::error::EXIT_PRECONDITION);
}
