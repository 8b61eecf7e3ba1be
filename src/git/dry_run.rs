use std::cell::RefCell;

use tracing::debug;

use super::{GitResult, Repository};
use crate::domain::tag::tag_ref;
use crate::ui;

/// Dry-run wrapper around any [Repository].
///
/// Read-only queries go to the wrapped repository, so preconditions are still
/// checked against real state. Mutating calls are printed as the git command
/// that would have run, recorded, and reported as successful.
pub struct DryRunRepository<R> {
    inner: R,
    planned: RefCell<Vec<String>>,
}

impl<R: Repository> DryRunRepository<R> {
    pub fn new(inner: R) -> Self {
        DryRunRepository {
            inner,
            planned: RefCell::new(Vec::new()),
        }
    }

    /// Commands skipped so far, in order
    pub fn planned(&self) -> Vec<String> {
        self.planned.borrow().clone()
    }

    fn skip(&self, command: String) -> GitResult<()> {
        debug!(%command, "dry-run: skipping");
        ui::display_dry_run(&command);
        self.planned.borrow_mut().push(command);
        Ok(())
    }
}

impl<R: Repository> Repository for DryRunRepository<R> {
    fn ensure_repository(&self) -> GitResult<()> {
        self.inner.ensure_repository()
    }

    fn ensure_remote(&self, remote: &str) -> GitResult<()> {
        self.inner.ensure_remote(remote)
    }

    fn fetch_remote_tags(&self) -> GitResult<()> {
        self.skip("git fetch --tags".to_string())
    }

    fn fetch_remote_refs(&self, remote: &str) -> GitResult<()> {
        self.skip(format!("git fetch --tags --prune {}", remote))
    }

    fn fast_forward_pull(&self, remote: &str) -> GitResult<()> {
        self.skip(format!("git pull --ff-only {}", remote))
    }

    fn tag_exists_locally(&self, tag: &str) -> GitResult<bool> {
        self.inner.tag_exists_locally(tag)
    }

    fn tag_exists_on_remote(&self, remote: &str, tag: &str) -> GitResult<bool> {
        self.inner.tag_exists_on_remote(remote, tag)
    }

    fn assert_tag_absent(&self, tag: &str) -> GitResult<()> {
        self.inner.assert_tag_absent(tag)
    }

    fn assert_tag_present(&self, tag: &str) -> GitResult<()> {
        self.inner.assert_tag_present(tag)
    }

    fn delete_local_tag(&self, tag: &str) -> GitResult<()> {
        self.skip(format!("git tag -d {}", tag))
    }

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        self.skip(format!("git push {} :{}", remote, tag_ref(tag)))
    }

    fn stage_all_changes(&self) -> GitResult<()> {
        self.skip("git add -A".to_string())
    }

    fn has_staged_changes(&self) -> GitResult<bool> {
        self.inner.has_staged_changes()
    }

    fn commit(&self, title: &str, body: &str) -> GitResult<()> {
        let mut command = format!("git commit -m {:?}", title);
        if !body.is_empty() {
            command.push_str(" -m <description>");
        }
        self.skip(command)
    }

    fn create_annotated_tag(&self, tag: &str, title: &str, body: &str) -> GitResult<()> {
        let mut command = format!("git tag -a {} -m {:?}", tag, title);
        if !body.is_empty() {
            command.push_str(" (with description)");
        }
        self.skip(command)
    }

    fn push_head(&self, remote: &str) -> GitResult<()> {
        self.skip(format!("git push {} HEAD", remote))
    }

    fn push_tag(&self, remote: &str, tag: &str) -> GitResult<()> {
        self.skip(format!("git push {} {}", remote, tag))
    }
}
