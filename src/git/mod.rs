//! Git operations abstraction layer
//!
//! The release flow never talks to git directly. It drives the [Repository]
//! trait, which exposes one method per version-control operation the flow
//! needs. Implementations:
//!
//! - [repository::Git2Repository]: the real repository, backed by `git2`
//! - [dry_run::DryRunRepository]: wraps any repository, forwards read-only
//!   queries and only reports mutating calls
//! - [mock::MockRepository]: in-memory fake that records every call
//!
//! ```rust
//! # use mdrelease::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> Result<(), Box<dyn std::error::Error>> {
//! repo.ensure_repository()?;
//! if !repo.tag_exists_locally("v1.2.3")? {
//!     repo.create_annotated_tag("v1.2.3", "Release title", "- First change")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod dry_run;
pub mod mock;
pub mod repository;

pub use dry_run::DryRunRepository;
pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::GitError;

/// Result of a single version-control operation
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Operation names carried by [GitError::op].
pub mod ops {
    pub const VALIDATE_REPOSITORY: &str = "validate git repository";
    pub const VALIDATE_REMOTE: &str = "validate git remote";
    pub const FETCH_TAGS: &str = "fetch tags";
    pub const FETCH_REMOTE: &str = "fetch remote refs";
    pub const PULL_FAST_FORWARD: &str = "pull fast-forward";
    pub const VALIDATE_TAG_ABSENCE: &str = "validate tag absence";
    pub const VALIDATE_LOCAL_TAG: &str = "validate local tag";
    pub const CHECK_LOCAL_TAG: &str = "check local tag";
    pub const CHECK_REMOTE_TAG: &str = "check remote tag";
    pub const DELETE_LOCAL_TAG: &str = "delete local tag";
    pub const DELETE_REMOTE_TAG: &str = "delete remote tag";
    pub const STAGE_CHANGES: &str = "stage changes";
    pub const CHECK_STAGED: &str = "check staged changes";
    pub const COMMIT: &str = "commit changes";
    pub const CREATE_TAG: &str = "create tag";
    pub const PUSH_COMMIT: &str = "push commit";
    pub const PUSH_TAG: &str = "push tag";
}

/// Commit or tag message: the title, then a blank line and the body if any.
pub fn compose_message(title: &str, body: &str) -> String {
    if body.is_empty() {
        title.to_string()
    } else {
        format!("{}\n\n{}", title, body)
    }
}

/// Version-control capabilities required by the release flow.
///
/// Every call is synchronous and either succeeds or fails with a [GitError]
/// naming the operation. Queries reflect the repository at the time of the
/// call; nothing is cached between calls.
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository): real repository via `git2`
/// - [DryRunRepository](dry_run::DryRunRepository): reports mutations instead of applying them
/// - [MockRepository](mock::MockRepository): test double
pub trait Repository {
    /// Check that the working directory is a non-bare git working tree.
    fn ensure_repository(&self) -> GitResult<()>;

    /// Check that a remote with this name is configured.
    fn ensure_remote(&self, remote: &str) -> GitResult<()>;

    /// Fetch all tags from the default remote.
    fn fetch_remote_tags(&self) -> GitResult<()>;

    /// Fetch branches and tags from `remote`, pruning deleted refs.
    fn fetch_remote_refs(&self, remote: &str) -> GitResult<()>;

    /// Fast-forward the current branch to its counterpart on `remote`.
    ///
    /// Fails when the branches have diverged; never merges or rebases.
    fn fast_forward_pull(&self, remote: &str) -> GitResult<()>;

    /// Whether `refs/tags/<tag>` exists locally.
    fn tag_exists_locally(&self, tag: &str) -> GitResult<bool>;

    /// Whether `refs/tags/<tag>` exists on `remote`.
    fn tag_exists_on_remote(&self, remote: &str, tag: &str) -> GitResult<bool>;

    /// Fail when the tag already exists locally.
    ///
    /// An existing tag fails with op [ops::VALIDATE_TAG_ABSENCE]; a failing
    /// query is returned unchanged.
    fn assert_tag_absent(&self, tag: &str) -> GitResult<()> {
        if self.tag_exists_locally(tag)? {
            return Err(GitError::new(
                ops::VALIDATE_TAG_ABSENCE,
                format!("tag {} already exists", tag),
            ));
        }
        Ok(())
    }

    /// Fail when the tag does not exist locally.
    ///
    /// A missing tag fails with op [ops::VALIDATE_LOCAL_TAG]; a failing query
    /// is returned unchanged.
    fn assert_tag_present(&self, tag: &str) -> GitResult<()> {
        if !self.tag_exists_locally(tag)? {
            return Err(GitError::new(
                ops::VALIDATE_LOCAL_TAG,
                format!("tag {} does not exist locally", tag),
            ));
        }
        Ok(())
    }

    fn delete_local_tag(&self, tag: &str) -> GitResult<()>;

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> GitResult<()>;

    /// Stage every change in the working tree, including deletions.
    fn stage_all_changes(&self) -> GitResult<()>;

    /// Whether the index differs from HEAD.
    fn has_staged_changes(&self) -> GitResult<bool>;

    /// Commit the index on the current branch.
    fn commit(&self, title: &str, body: &str) -> GitResult<()>;

    /// Create an annotated tag at HEAD.
    fn create_annotated_tag(&self, tag: &str, title: &str, body: &str) -> GitResult<()>;

    /// Push the current branch to the same-named branch on `remote`.
    fn push_head(&self, remote: &str) -> GitResult<()>;

    fn push_tag(&self, remote: &str, tag: &str) -> GitResult<()>;
}

impl<R: Repository + ?Sized> Repository for &R {
    fn ensure_repository(&self) -> GitResult<()> {
        (**self).ensure_repository()
    }

    fn ensure_remote(&self, remote: &str) -> GitResult<()> {
        (**self).ensure_remote(remote)
    }

    fn fetch_remote_tags(&self) -> GitResult<()> {
        (**self).fetch_remote_tags()
    }

    fn fetch_remote_refs(&self, remote: &str) -> GitResult<()> {
        (**self).fetch_remote_refs(remote)
    }

    fn fast_forward_pull(&self, remote: &str) -> GitResult<()> {
        (**self).fast_forward_pull(remote)
    }

    fn tag_exists_locally(&self, tag: &str) -> GitResult<bool> {
        (**self).tag_exists_locally(tag)
    }

    fn tag_exists_on_remote(&self, remote: &str, tag: &str) -> GitResult<bool> {
        (**self).tag_exists_on_remote(remote, tag)
    }

    fn assert_tag_absent(&self, tag: &str) -> GitResult<()> {
        (**self).assert_tag_absent(tag)
    }

    fn assert_tag_present(&self, tag: &str) -> GitResult<()> {
        (**self).assert_tag_present(tag)
    }

    fn delete_local_tag(&self, tag: &str) -> GitResult<()> {
        (**self).delete_local_tag(tag)
    }

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        (**self).delete_remote_tag(remote, tag)
    }

    fn stage_all_changes(&self) -> GitResult<()> {
        (**self).stage_all_changes()
    }

    fn has_staged_changes(&self) -> GitResult<bool> {
        (**self).has_staged_changes()
    }

    fn commit(&self, title: &str, body: &str) -> GitResult<()> {
        (**self).commit(title, body)
    }

    fn create_annotated_tag(&self, tag: &str, title: &str, body: &str) -> GitResult<()> {
        (**self).create_annotated_tag(tag, title, body)
    }

    fn push_head(&self, remote: &str) -> GitResult<()> {
        (**self).push_head(remote)
    }

    fn push_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        (**self).push_tag(remote, tag)
    }
}
