use std::fmt;

/// The tag that marks a release: `tag_prefix + version` (e.g. "v1.2.3").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
}

impl ReleaseTag {
    /// Build the tag for a version using the configured prefix
    /// Example: prefix="v", version="1.2.3" -> "v1.2.3"
    pub fn new(prefix: &str, version: &str) -> Self {
        ReleaseTag {
            name: format!("{}{}", prefix, version),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reference name for a tag
pub fn tag_ref(tag: &str) -> String {
    format!("refs/tags/{}", tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_with_default_prefix() {
        let tag = ReleaseTag::new("v", "1.2.3");
        assert_eq!(tag.name(), "v1.2.3");
        assert_eq!(tag.to_string(), "v1.2.3");
    }

    #[test]
    fn test_tag_with_custom_prefix() {
        let tag = ReleaseTag::new("release-", "2.0-rc.1");
        assert_eq!(tag.name(), "release-2.0-rc.1");
    }

    #[test]
    fn test_tag_without_prefix() {
        let tag = ReleaseTag::new("", "1.0.0");
        assert_eq!(tag.name(), "1.0.0");
    }

    #[test]
    fn test_tag_ref() {
        let tag = ReleaseTag::new("v", "1.2.3+build.5");
        assert_eq!(tag_ref(tag.name()), "refs/tags/v1.2.3+build.5");
    }
}
