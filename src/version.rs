//! Version of the tool itself.
//!
//! The release notes of mdrelease are embedded at build time; the installed
//! version is the latest entry of that document, so the binary always reports
//! the version it was released as.

use crate::changelog;

const EMBEDDED_CHANGELOG: &str = include_str!("../changelog.md");

/// Version reported by `mdrelease --version`.
///
/// Falls back to the package version if the embedded changelog has no
/// release entry. Call once at startup and pass the value down.
pub fn tool_version() -> String {
    version_from_document(EMBEDDED_CHANGELOG)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn version_from_document(document: &str) -> Option<String> {
    changelog::parse_latest_str(document, "changelog.md")
        .ok()
        .map(|entry| entry.version)
}

/// Line printed by `--version`, e.g. "mdrelease version v0.3.0"
pub fn version_line(tool_version: &str) -> String {
    format!("mdrelease version v{}", tool_version)
}
