//! User interface module - everything the operator sees on the terminal.
//!
//! - `formatter` - Formatting and printing primitives
//! - This module - Release-specific summaries built on top of them

pub mod formatter;

pub use formatter::{
    display_block, display_boundary_warning, display_dry_run, display_error, display_plain,
    display_status, display_success, format_block, format_manual_push_instruction,
};

use crate::changelog::ReleaseEntry;
use crate::domain::{ActionSet, ReleaseTag};

/// Rows describing the release about to run.
pub fn release_info_rows(
    changelog_path: &str,
    entry: &ReleaseEntry,
    tag: &ReleaseTag,
    actions: Option<&ActionSet>,
    dry_run: bool,
) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Changelog", changelog_path.to_string()),
        ("Version", entry.version.clone()),
        ("Title", entry.summary.clone()),
        ("Tag", tag.to_string()),
    ];
    if let Some(actions) = actions {
        rows.push(("Actions", actions.to_string()));
    }
    if dry_run {
        rows.push(("Mode", "dry-run".to_string()));
    }
    rows
}

/// Display the release summary printed before any git operation.
pub fn display_release_info(
    heading: &str,
    changelog_path: &str,
    entry: &ReleaseEntry,
    tag: &ReleaseTag,
    actions: Option<&ActionSet>,
    dry_run: bool,
) {
    display_block(
        heading,
        &release_info_rows(changelog_path, entry, tag, actions, dry_run),
    );
}
