use thiserror::Error;

/// Process exit codes, one per error class.
pub const EXIT_OK: i32 = 0;
pub const EXIT_GENERAL: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_PARSE: i32 = 3;
pub const EXIT_PRECONDITION: i32 = 4;
pub const EXIT_GIT: i32 = 5;

/// Unified error type for mdrelease operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Malformed invocation, caught before any repository access
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Routine operator mistake; the message names the remedy
    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Git(#[from] GitError),

    /// The release tag exists locally but could not be pushed
    #[error("{source} (tag {tag} was created locally and may need manual push/retry)")]
    TagCreatedLocallyOnly { tag: String, source: GitError },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results in mdrelease
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a usage error with context
    pub fn usage(msg: impl Into<String>) -> Self {
        ReleaseError::Usage(msg.into())
    }

    /// Create a precondition error with context
    pub fn precondition(msg: impl Into<String>) -> Self {
        ReleaseError::Precondition(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Map the error to the process exit code of its class.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::Usage(_) => EXIT_USAGE,
            ReleaseError::Parse(_) => EXIT_PARSE,
            ReleaseError::Precondition(_) => EXIT_PRECONDITION,
            ReleaseError::Git(_) | ReleaseError::TagCreatedLocallyOnly { .. } => EXIT_GIT,
            ReleaseError::Config(_) => EXIT_GENERAL,
        }
    }
}

/// Failure to read or interpret the changelog document.
#[derive(Error, Debug)]
#[error("{path}: {message}{}", cause_suffix(.source.as_ref()))]
pub struct ParseError {
    /// Identifier of the document (usually its path)
    pub path: String,
    pub message: String,
    #[source]
    pub source: Option<std::io::Error>,
}

fn cause_suffix(source: Option<&std::io::Error>) -> String {
    source.map(|e| format!(": {}", e)).unwrap_or_default()
}

impl ParseError {
    /// The document could not be opened or read.
    pub fn io(path: impl Into<String>, message: impl Into<String>, source: std::io::Error) -> Self {
        ParseError {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// The document was read but holds no release entry.
    pub fn grammar(path: impl Into<String>) -> Self {
        ParseError {
            path: path.into(),
            message: format!(
                "unable to parse latest release entry (expected {})",
                crate::changelog::EXPECTED_FORMAT
            ),
            source: None,
        }
    }
}

/// A version-control operation failed.
///
/// `op` names the operation (e.g. "push tag") so the failure can be traced
/// without re-running in verbose mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op}: {message}")]
pub struct GitError {
    pub op: String,
    pub message: String,
}

impl GitError {
    pub fn new(op: impl Into<String>, message: impl Into<String>) -> Self {
        GitError {
            op: op.into(),
            message: message.into(),
        }
    }

    /// Wrap a libgit2 error under the given operation name
    pub fn from_git2(op: impl Into<String>, err: &git2::Error) -> Self {
        GitError::new(op, err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let codes = [
            ReleaseError::usage("x").exit_code(),
            ReleaseError::Parse(ParseError::grammar("changelog.md")).exit_code(),
            ReleaseError::precondition("x").exit_code(),
            ReleaseError::Git(GitError::new("push tag", "rejected")).exit_code(),
            ReleaseError::config("x").exit_code(),
        ];

        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert!(!codes.contains(&EXIT_OK));
    }

    #[test]
    fn test_parse_error_names_expected_format() {
        let err = ParseError::grammar("docs/changelog.md");
        let msg = err.to_string();
        assert!(msg.starts_with("docs/changelog.md: "));
        assert!(msg.contains("# <version> - <summary>"));
    }

    #[test]
    fn test_parse_error_includes_io_cause() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ParseError::io("missing.md", "failed to open changelog", io_err);
        assert_eq!(
            err.to_string(),
            "missing.md: failed to open changelog: no such file"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_git_error_names_operation() {
        let err = GitError::new("validate git remote", "no \"origin\" remote set");
        assert_eq!(
            err.to_string(),
            "validate git remote: no \"origin\" remote set"
        );
    }

    #[test]
    fn test_tag_created_locally_only_message() {
        let err = ReleaseError::TagCreatedLocallyOnly {
            tag: "v1.2.3".to_string(),
            source: GitError::new("push tag", "network unreachable"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("push tag: network unreachable"));
        assert!(msg.contains("v1.2.3 was created locally"));
        assert_eq!(err.exit_code(), EXIT_GIT);
    }
}
