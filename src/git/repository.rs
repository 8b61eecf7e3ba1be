use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{
    Commit, Cred, CredentialType, Direction, ErrorCode, FetchOptions, FetchPrune, IndexAddOption,
    ObjectType, PushOptions, Reference, RemoteCallbacks, Repository as Git2Repo,
};
use tracing::debug;

use super::{compose_message, ops, GitResult};
use crate::domain::tag::tag_ref;
use crate::error::GitError;

/// Remote used by [Git2Repository::fetch_remote_tags] when the current
/// branch tracks nothing.
const FALLBACK_REMOTE: &str = "origin";

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open the repository containing `path` (searching parent directories)
    pub fn discover<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let repo = Git2Repo::discover(path).map_err(|e| {
            GitError::new(
                ops::VALIDATE_REPOSITORY,
                format!("not a git repository ({})", e.message()),
            )
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Credentials for fetch/push: SSH agent, then keys in ~/.ssh, then the
    /// configured credential helper, then libgit2 defaults.
    fn remote_callbacks(&self) -> RemoteCallbacks<'static> {
        let config = self.repo.config().ok();
        let mut attempts = 0;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > 4 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            let username = username_from_url.unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) {
                if attempts == 1 {
                    if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                        return Ok(cred);
                    }
                }
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(config) = config.as_ref() {
                    if let Ok(cred) = Cred::credential_helper(config, url, username_from_url) {
                        return Ok(cred);
                    }
                }
            }

            Cred::default()
        });
        callbacks
    }

    fn find_remote(&self, op: &str, name: &str) -> GitResult<git2::Remote<'_>> {
        self.repo
            .find_remote(name)
            .map_err(|e| GitError::new(op, format!("remote '{}' not found: {}", name, e.message())))
    }

    fn valid_tag_ref(op: &str, tag: &str) -> GitResult<String> {
        let name = tag_ref(tag);
        if Reference::is_valid_name(&name) {
            Ok(name)
        } else {
            Err(GitError::new(op, format!("invalid ref name \"{}\"", name)))
        }
    }

    /// Name of the checked-out branch (e.g. "main"). Fails on a detached HEAD.
    fn current_branch(&self, op: &str) -> GitResult<(String, git2::Oid)> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(op, &e))?;

        if !head.is_branch() {
            return Err(GitError::new(
                op,
                "HEAD is detached; check out a branch before releasing",
            ));
        }

        let name = head
            .shorthand()
            .ok_or_else(|| GitError::new(op, "current branch name is not valid UTF-8"))?
            .to_string();
        let oid = head
            .target()
            .ok_or_else(|| GitError::new(op, format!("branch '{}' has no target", name)))?;

        Ok((name, oid))
    }

    fn head_commit(&self, op: &str) -> GitResult<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map(Some)
                .map_err(|e| GitError::from_git2(op, &e)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(op, &e)),
        }
    }

    fn fetch(&self, op: &str, remote_name: &str, refspecs: &[&str], prune: bool) -> GitResult<()> {
        let mut remote = self.find_remote(op, remote_name)?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks());
        if prune {
            fetch_options.prune(FetchPrune::On);
        }

        debug!(op, remote = remote_name, ?refspecs, "fetching");
        remote
            .fetch(refspecs, Some(&mut fetch_options), None)
            .map_err(|e| {
                GitError::new(
                    op,
                    format!("failed to fetch from '{}': {}", remote_name, e.message()),
                )
            })
    }

    fn push_refspec(&self, op: &str, remote_name: &str, refspec: &str) -> GitResult<()> {
        let mut remote = self.find_remote(op, remote_name)?;

        let mut callbacks = self.remote_callbacks();
        // The server may accept the pack but refuse the ref update.
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        debug!(op, remote = remote_name, refspec, "pushing");
        remote
            .push(&[refspec], Some(&mut push_options))
            .map_err(|e| {
                let detail = match e.class() {
                    git2::ErrorClass::Net => format!("network error: {}", e.message()),
                    git2::ErrorClass::Reference => format!("reference error: {}", e.message()),
                    _ => e.message().to_string(),
                };
                GitError::new(op, format!("push to '{}' failed: {}", remote_name, detail))
            })
    }
}

impl super::Repository for Git2Repository {
    fn ensure_repository(&self) -> GitResult<()> {
        if self.repo.is_bare() || self.repo.workdir().is_none() {
            return Err(GitError::new(
                ops::VALIDATE_REPOSITORY,
                "not a git working tree (bare repository)",
            ));
        }
        Ok(())
    }

    fn ensure_remote(&self, remote: &str) -> GitResult<()> {
        match self.repo.find_remote(remote) {
            Ok(_) => Ok(()),
            Err(_) => Err(GitError::new(
                ops::VALIDATE_REMOTE,
                format!(
                    "no \"{remote}\" remote set (set one with `git remote add {remote} <url>` or pass --remote <name>)"
                ),
            )),
        }
    }

    fn fetch_remote_tags(&self) -> GitResult<()> {
        let remote = match self.current_branch(ops::FETCH_TAGS) {
            Ok((branch, _)) => self
                .repo
                .branch_upstream_remote(&format!("refs/heads/{}", branch))
                .ok()
                .and_then(|buf| buf.as_str().map(str::to_string))
                .unwrap_or_else(|| FALLBACK_REMOTE.to_string()),
            Err(_) => FALLBACK_REMOTE.to_string(),
        };

        self.fetch(ops::FETCH_TAGS, &remote, &["+refs/tags/*:refs/tags/*"], false)
    }

    fn fetch_remote_refs(&self, remote: &str) -> GitResult<()> {
        let heads = format!("+refs/heads/*:refs/remotes/{}/*", remote);
        self.fetch(ops::FETCH_REMOTE, remote, &[heads.as_str()], true)?;
        // Tags are never pruned: a tag created locally but not pushed yet must survive.
        self.fetch(ops::FETCH_REMOTE, remote, &["+refs/tags/*:refs/tags/*"], false)
    }

    fn fast_forward_pull(&self, remote: &str) -> GitResult<()> {
        let op = ops::PULL_FAST_FORWARD;
        let (branch, local_oid) = self.current_branch(op)?;

        let tracking = format!("refs/remotes/{}/{}", remote, branch);
        let remote_oid = match self.repo.find_reference(&tracking) {
            Ok(reference) => reference
                .target()
                .ok_or_else(|| GitError::new(op, format!("{} has no target", tracking)))?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(op, %tracking, "no remote counterpart, nothing to pull");
                return Ok(());
            }
            Err(e) => return Err(GitError::from_git2(op, &e)),
        };

        if local_oid == remote_oid {
            return Ok(());
        }

        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(local_oid, remote_oid)
            .map_err(|e| GitError::from_git2(op, &e))?;

        if behind == 0 {
            return Ok(());
        }
        if ahead > 0 {
            return Err(GitError::new(
                op,
                format!(
                    "'{}' and '{}/{}' have diverged ({} ahead, {} behind); not possible to fast-forward",
                    branch, remote, branch, ahead, behind
                ),
            ));
        }

        let target = self
            .repo
            .find_object(remote_oid, None)
            .map_err(|e| GitError::from_git2(op, &e))?;
        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(|e| GitError::from_git2(op, &e))?;

        let mut reference = self
            .repo
            .find_reference(&format!("refs/heads/{}", branch))
            .map_err(|e| GitError::from_git2(op, &e))?;
        reference
            .set_target(remote_oid, &format!("pull --ff-only: fast-forward to {}", tracking))
            .map_err(|e| GitError::from_git2(op, &e))?;

        debug!(op, %branch, %remote_oid, "fast-forwarded");
        Ok(())
    }

    fn tag_exists_locally(&self, tag: &str) -> GitResult<bool> {
        let op = ops::CHECK_LOCAL_TAG;
        let name = Self::valid_tag_ref(op, tag)?;

        match self.repo.find_reference(&name) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::from_git2(op, &e)),
        }
    }

    fn tag_exists_on_remote(&self, remote: &str, tag: &str) -> GitResult<bool> {
        let op = ops::CHECK_REMOTE_TAG;
        let name = Self::valid_tag_ref(op, tag)?;
        let mut remote = self.find_remote(op, remote)?;

        let connection = remote
            .connect_auth(Direction::Fetch, Some(self.remote_callbacks()), None)
            .map_err(|e| GitError::from_git2(op, &e))?;
        let heads = connection
            .list()
            .map_err(|e| GitError::from_git2(op, &e))?;

        Ok(heads.iter().any(|head| head.name() == name))
    }

    fn delete_local_tag(&self, tag: &str) -> GitResult<()> {
        let op = ops::DELETE_LOCAL_TAG;
        Self::valid_tag_ref(op, tag)?;
        self.repo
            .tag_delete(tag)
            .map_err(|e| GitError::from_git2(op, &e))
    }

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        let op = ops::DELETE_REMOTE_TAG;
        let name = Self::valid_tag_ref(op, tag)?;
        self.push_refspec(op, remote, &format!(":{}", name))
    }

    fn stage_all_changes(&self) -> GitResult<()> {
        let op = ops::STAGE_CHANGES;
        let mut index = self.repo.index().map_err(|e| GitError::from_git2(op, &e))?;

        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(|e| GitError::from_git2(op, &e))?;
        // add_all does not pick up removed files
        index
            .update_all(["*"].iter(), None)
            .map_err(|e| GitError::from_git2(op, &e))?;
        index.write().map_err(|e| GitError::from_git2(op, &e))
    }

    fn has_staged_changes(&self) -> GitResult<bool> {
        let op = ops::CHECK_STAGED;
        let index = self.repo.index().map_err(|e| GitError::from_git2(op, &e))?;

        let head_tree = match self.head_commit(op)? {
            Some(commit) => Some(commit.tree().map_err(|e| GitError::from_git2(op, &e))?),
            None => None,
        };

        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)
            .map_err(|e| GitError::from_git2(op, &e))?;

        Ok(diff.deltas().len() > 0)
    }

    fn commit(&self, title: &str, body: &str) -> GitResult<()> {
        let op = ops::COMMIT;
        let signature = self.repo.signature().map_err(|e| GitError::from_git2(op, &e))?;

        let mut index = self.repo.index().map_err(|e| GitError::from_git2(op, &e))?;
        let tree_oid = index.write_tree().map_err(|e| GitError::from_git2(op, &e))?;
        let tree = self
            .repo
            .find_tree(tree_oid)
            .map_err(|e| GitError::from_git2(op, &e))?;

        let parent = self.head_commit(op)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &compose_message(title, body),
                &tree,
                &parents,
            )
            .map_err(|e| GitError::from_git2(op, &e))?;

        debug!(op, %oid, "committed");
        Ok(())
    }

    fn create_annotated_tag(&self, tag: &str, title: &str, body: &str) -> GitResult<()> {
        let op = ops::CREATE_TAG;
        Self::valid_tag_ref(op, tag)?;

        let target = self
            .repo
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .map_err(|e| GitError::from_git2(op, &e))?;
        let signature = self.repo.signature().map_err(|e| GitError::from_git2(op, &e))?;

        self.repo
            .tag(tag, &target, &signature, &compose_message(title, body), false)
            .map_err(|e| GitError::from_git2(op, &e))?;

        Ok(())
    }

    fn push_head(&self, remote: &str) -> GitResult<()> {
        let op = ops::PUSH_COMMIT;
        let (branch, _) = self.current_branch(op)?;
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        self.push_refspec(op, remote, &refspec)
    }

    fn push_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        let op = ops::PUSH_TAG;
        let name = Self::valid_tag_ref(op, tag)?;
        self.push_refspec(op, remote, &format!("{}:{}", name, name))
    }
}
