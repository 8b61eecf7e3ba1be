//! Changelog parsing.
//!
//! Extracts the latest release entry from a markdown changelog. A release
//! entry starts at a top-level heading of the form `# <version> - <summary>`
//! and runs until the next such heading. Any other top-level heading before
//! the first entry (a document title, for instance) is skipped.
//!
//! ```text
//! # Changelog
//!
//! # 1.2.3 - Add release flow
//! - Added parser
//! - Added tests
//!
//! # 1.2.2 - Previous
//! ```

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;

/// Changelog location used when the caller configures none.
pub const DEFAULT_PATH: &str = "changelog.md";

/// Heading grammar shown to the operator on parse failures.
pub const EXPECTED_FORMAT: &str = "# <version> - <summary>";

const BULLET_PREFIX: &str = "- ";

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(
            r"^#\s+([0-9]+(?:\.[0-9]+){1,2}(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)\s*-\s*(.+)$",
        )
        .expect("release heading pattern is valid")
    })
}

/// The latest release described by a changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    /// Version string, e.g. "1.2.3" or "1.2.3-beta.1+exp.sha"
    pub version: String,
    /// One-line summary taken from the heading
    pub summary: String,
    /// Bullet lines, each prefixed with "- " and joined by newlines
    pub description: String,
}

impl ReleaseEntry {
    /// The bullet texts without their "- " prefix.
    pub fn bullets(&self) -> Vec<&str> {
        self.description
            .lines()
            .map(|line| line.strip_prefix(BULLET_PREFIX).unwrap_or(line))
            .collect()
    }
}

/// Join bullet texts into a description, normalizing surrounding whitespace
/// and dropping empty items.
pub fn format_description<S: AsRef<str>>(bullets: &[S]) -> String {
    bullets
        .iter()
        .map(|b| b.as_ref().trim())
        .filter(|b| !b.is_empty())
        .map(|b| format!("{}{}", BULLET_PREFIX, b))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads the changelog at `path` and parses its latest release entry.
///
/// # Errors
/// * The file cannot be opened or read
/// * No line matches `# <version> - <summary>`
pub fn parse_latest(path: impl AsRef<Path>) -> Result<ReleaseEntry, ParseError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let document = fs::read_to_string(path).map_err(|e| {
        let message = if e.kind() == std::io::ErrorKind::InvalidData {
            "failed while reading changelog"
        } else {
            "failed to open changelog"
        };
        ParseError::io(display.clone(), message, e)
    })?;

    parse_latest_str(&document, &display)
}

/// Parses the latest release entry from an in-memory document.
///
/// `source` identifies the document in error messages.
pub fn parse_latest_str(document: &str, source: &str) -> Result<ReleaseEntry, ParseError> {
    let heading = heading_regex();
    let mut active: Option<(String, String)> = None;
    let mut bullets: Vec<String> = Vec::new();

    for line in document.lines() {
        if line.starts_with('#') {
            let Some(caps) = heading.captures(line) else {
                continue;
            };
            if active.is_some() {
                // Next release entry; the latest one ends here.
                break;
            }
            active = Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
            continue;
        }

        if active.is_none() {
            continue;
        }

        if let Some(rest) = line.trim().strip_prefix('-') {
            let bullet = rest.trim();
            if !bullet.is_empty() {
                bullets.push(bullet.to_string());
            }
        }
    }

    match active {
        Some((version, summary)) if !summary.is_empty() => Ok(ReleaseEntry {
            version,
            summary,
            description: format_description(&bullets),
        }),
        _ => Err(ParseError::grammar(source)),
    }
}
