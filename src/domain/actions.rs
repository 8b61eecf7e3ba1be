use std::fmt;

use crate::error::{ReleaseError, Result};

/// Release steps exactly as the caller asked for them, before resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionRequest {
    /// Run the full pipeline
    pub all: bool,
    pub stage_all: bool,
    pub commit: bool,
    pub tag: bool,
    /// Shorthand for `push_commit` + `push_tag`
    pub push: bool,
    pub push_commit: bool,
    pub push_tag: bool,
}

impl ActionRequest {
    /// Whether any individual step was named
    pub fn has_explicit_actions(&self) -> bool {
        self.stage_all || self.commit || self.tag || self.push || self.push_commit || self.push_tag
    }

    /// Resolve the request into the steps to perform.
    ///
    /// * nothing requested -> full pipeline
    /// * `all` alone -> full pipeline
    /// * `all` with any individual step -> usage error
    /// * otherwise the named steps, with `push` expanded to both pushes
    pub fn resolve(&self) -> Result<ActionSet> {
        let explicit = self.has_explicit_actions();

        if self.all && explicit {
            return Err(ReleaseError::usage(
                "--all cannot be combined with individual release action flags",
            ));
        }

        if !explicit {
            return Ok(ActionSet::full());
        }

        Ok(ActionSet {
            stage_all: self.stage_all,
            commit: self.commit,
            tag: self.tag,
            push_commit: self.push_commit || self.push,
            push_tag: self.push_tag || self.push,
        })
    }
}

/// Resolved set of release steps for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub stage_all: bool,
    pub commit: bool,
    pub tag: bool,
    pub push_commit: bool,
    pub push_tag: bool,
}

impl ActionSet {
    /// Every step: stage, commit, tag, push commit, push tag
    pub fn full() -> Self {
        ActionSet {
            stage_all: true,
            commit: true,
            tag: true,
            push_commit: true,
            push_tag: true,
        }
    }

    /// Whether any step talks to the remote
    pub fn needs_remote(&self) -> bool {
        self.push_commit || self.push_tag
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (self.stage_all, "stage-all"),
            (self.commit, "commit"),
            (self.tag, "tag"),
            (self.push_commit, "push-commit"),
            (self.push_tag, "push-tag"),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, name)| *name)
        .collect();

        if parts.is_empty() {
            write!(f, "(none)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
