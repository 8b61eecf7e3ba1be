use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{compose_message, ops, GitResult, Repository};
use crate::error::GitError;

#[derive(Debug)]
struct MockState {
    work_tree: bool,
    remotes: BTreeSet<String>,
    /// tag name -> annotation message
    local_tags: BTreeMap<String, String>,
    remote_tags: BTreeSet<String>,
    staged: bool,
    working_tree_changes: bool,
    commits: Vec<String>,
    pushed_heads: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            work_tree: true,
            remotes: BTreeSet::from(["origin".to_string()]),
            local_tags: BTreeMap::new(),
            remote_tags: BTreeSet::new(),
            staged: false,
            working_tree_changes: false,
            commits: Vec::new(),
            pushed_heads: Vec::new(),
        }
    }
}

/// Mock repository for testing without actual git operations
///
/// Starts as a valid working tree with an `origin` remote, no tags and no
/// changes. Every trait call is recorded as `method[:arg...]` (see
/// [MockRepository::calls]); mutating calls update the in-memory state the
/// way git would.
pub struct MockRepository {
    state: RefCell<MockState>,
    calls: RefCell<Vec<String>>,
    failures: HashMap<String, String>,
}

impl MockRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        MockRepository {
            state: RefCell::new(MockState::default()),
            calls: RefCell::new(Vec::new()),
            failures: HashMap::new(),
        }
    }

    /// Make the working directory look like it is outside any repository
    pub fn set_work_tree(&mut self, work_tree: bool) {
        self.state.get_mut().work_tree = work_tree;
    }

    pub fn add_remote(&mut self, name: impl Into<String>) {
        self.state.get_mut().remotes.insert(name.into());
    }

    pub fn remove_remote(&mut self, name: &str) {
        self.state.get_mut().remotes.remove(name);
    }

    pub fn add_local_tag(&mut self, name: impl Into<String>) {
        self.state.get_mut().local_tags.insert(name.into(), String::new());
    }

    pub fn add_remote_tag(&mut self, name: impl Into<String>) {
        self.state.get_mut().remote_tags.insert(name.into());
    }

    /// Whether the index already differs from HEAD
    pub fn set_staged_changes(&mut self, staged: bool) {
        self.state.get_mut().staged = staged;
    }

    /// Whether there are unstaged edits that `stage_all_changes` would pick up
    pub fn set_working_tree_changes(&mut self, changes: bool) {
        self.state.get_mut().working_tree_changes = changes;
    }

    /// Make the named trait method fail with `message`
    pub fn fail_on(&mut self, method: impl Into<String>, message: impl Into<String>) {
        self.failures.insert(method.into(), message.into());
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Messages of the commits created, in order
    pub fn commits(&self) -> Vec<String> {
        self.state.borrow().commits.clone()
    }

    /// Remotes HEAD was pushed to, in order
    pub fn pushed_heads(&self) -> Vec<String> {
        self.state.borrow().pushed_heads.clone()
    }

    pub fn has_local_tag(&self, name: &str) -> bool {
        self.state.borrow().local_tags.contains_key(name)
    }

    pub fn has_remote_tag(&self, name: &str) -> bool {
        self.state.borrow().remote_tags.contains(name)
    }

    /// Annotation message of a local tag
    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.state.borrow().local_tags.get(name).cloned()
    }

    fn record(&self, method: &str, op: &str, args: &[&str]) -> GitResult<()> {
        let mut entry = method.to_string();
        for arg in args {
            entry.push(':');
            entry.push_str(arg);
        }
        self.calls.borrow_mut().push(entry);

        match self.failures.get(method) {
            Some(message) => Err(GitError::new(op, message.clone())),
            None => Ok(()),
        }
    }

    fn require_remote(&self, op: &str, remote: &str) -> GitResult<()> {
        if self.state.borrow().remotes.contains(remote) {
            Ok(())
        } else {
            Err(GitError::new(op, format!("remote '{}' not found", remote)))
        }
    }

    fn pull_remote_tags(&self) {
        let mut state = self.state.borrow_mut();
        let remote_tags: Vec<String> = state.remote_tags.iter().cloned().collect();
        for tag in remote_tags {
            state.local_tags.entry(tag).or_default();
        }
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn ensure_repository(&self) -> GitResult<()> {
        self.record("ensure_repository", ops::VALIDATE_REPOSITORY, &[])?;
        if self.state.borrow().work_tree {
            Ok(())
        } else {
            Err(GitError::new(ops::VALIDATE_REPOSITORY, "not a git repository"))
        }
    }

    fn ensure_remote(&self, remote: &str) -> GitResult<()> {
        self.record("ensure_remote", ops::VALIDATE_REMOTE, &[remote])?;
        self.require_remote(ops::VALIDATE_REMOTE, remote)
    }

    fn fetch_remote_tags(&self) -> GitResult<()> {
        self.record("fetch_remote_tags", ops::FETCH_TAGS, &[])?;
        self.pull_remote_tags();
        Ok(())
    }

    fn fetch_remote_refs(&self, remote: &str) -> GitResult<()> {
        self.record("fetch_remote_refs", ops::FETCH_REMOTE, &[remote])?;
        self.require_remote(ops::FETCH_REMOTE, remote)?;
        self.pull_remote_tags();
        Ok(())
    }

    fn fast_forward_pull(&self, remote: &str) -> GitResult<()> {
        self.record("fast_forward_pull", ops::PULL_FAST_FORWARD, &[remote])?;
        self.require_remote(ops::PULL_FAST_FORWARD, remote)
    }

    fn tag_exists_locally(&self, tag: &str) -> GitResult<bool> {
        self.record("tag_exists_locally", ops::CHECK_LOCAL_TAG, &[tag])?;
        Ok(self.has_local_tag(tag))
    }

    fn tag_exists_on_remote(&self, remote: &str, tag: &str) -> GitResult<bool> {
        self.record("tag_exists_on_remote", ops::CHECK_REMOTE_TAG, &[remote, tag])?;
        self.require_remote(ops::CHECK_REMOTE_TAG, remote)?;
        Ok(self.has_remote_tag(tag))
    }

    fn delete_local_tag(&self, tag: &str) -> GitResult<()> {
        self.record("delete_local_tag", ops::DELETE_LOCAL_TAG, &[tag])?;
        match self.state.borrow_mut().local_tags.remove(tag) {
            Some(_) => Ok(()),
            None => Err(GitError::new(
                ops::DELETE_LOCAL_TAG,
                format!("tag '{}' not found", tag),
            )),
        }
    }

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        self.record("delete_remote_tag", ops::DELETE_REMOTE_TAG, &[remote, tag])?;
        self.require_remote(ops::DELETE_REMOTE_TAG, remote)?;
        if self.state.borrow_mut().remote_tags.remove(tag) {
            Ok(())
        } else {
            Err(GitError::new(
                ops::DELETE_REMOTE_TAG,
                format!("unable to delete '{}': remote ref does not exist", tag),
            ))
        }
    }

    fn stage_all_changes(&self) -> GitResult<()> {
        self.record("stage_all_changes", ops::STAGE_CHANGES, &[])?;
        let mut state = self.state.borrow_mut();
        if state.working_tree_changes {
            state.staged = true;
            state.working_tree_changes = false;
        }
        Ok(())
    }

    fn has_staged_changes(&self) -> GitResult<bool> {
        self.record("has_staged_changes", ops::CHECK_STAGED, &[])?;
        Ok(self.state.borrow().staged)
    }

    fn commit(&self, title: &str, body: &str) -> GitResult<()> {
        self.record("commit", ops::COMMIT, &[title])?;
        let mut state = self.state.borrow_mut();
        if !state.staged {
            return Err(GitError::new(ops::COMMIT, "nothing to commit"));
        }
        state.staged = false;
        state.commits.push(compose_message(title, body));
        Ok(())
    }

    fn create_annotated_tag(&self, tag: &str, title: &str, body: &str) -> GitResult<()> {
        self.record("create_annotated_tag", ops::CREATE_TAG, &[tag])?;
        let mut state = self.state.borrow_mut();
        if state.local_tags.contains_key(tag) {
            return Err(GitError::new(
                ops::CREATE_TAG,
                format!("tag '{}' already exists", tag),
            ));
        }
        state
            .local_tags
            .insert(tag.to_string(), compose_message(title, body));
        Ok(())
    }

    fn push_head(&self, remote: &str) -> GitResult<()> {
        self.record("push_head", ops::PUSH_COMMIT, &[remote])?;
        self.require_remote(ops::PUSH_COMMIT, remote)?;
        self.state.borrow_mut().pushed_heads.push(remote.to_string());
        Ok(())
    }

    fn push_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        self.record("push_tag", ops::PUSH_TAG, &[remote, tag])?;
        self.require_remote(ops::PUSH_TAG, remote)?;
        if !self.has_local_tag(tag) {
            return Err(GitError::new(
                ops::PUSH_TAG,
                format!("src refspec {} does not match any", tag),
            ));
        }
        self.state.borrow_mut().remote_tags.insert(tag.to_string());
        Ok(())
    }
}
