use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::changelog;
use crate::error::{ReleaseError, Result};

/// Environment variable overriding the changelog location.
pub const CHANGELOG_ENV: &str = "MDRELEASE_CHANGELOG";

/// Config file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "mdrelease.toml";

/// Represents the complete configuration file for mdrelease.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,
}

fn default_changelog() -> String {
    changelog::DEFAULT_PATH.to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

/// `[release]` table: defaults for the release flags.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    #[serde(default = "default_changelog")]
    pub changelog: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            changelog: default_changelog(),
            remote: default_remote(),
            tag_prefix: default_tag_prefix(),
        }
    }
}

/// User-level config location: `<config_dir>/mdrelease/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mdrelease").join("config.toml"))
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter (must exist)
/// 2. `mdrelease.toml` in current directory
/// 3. `mdrelease/config.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        PathBuf::from(path)
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        PathBuf::from(LOCAL_CONFIG_FILE)
    } else {
        match user_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        }
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_config(&content)
        .map_err(|e| ReleaseError::config(format!("invalid {}: {}", path.display(), e)))
}

/// Parse a config document.
pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Changelog path: flag, then environment, then config file/default.
///
/// Blank values are treated as unset.
pub fn resolve_changelog_path<F>(flag: Option<&str>, getenv: F, config: &Config) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = non_blank(flag) {
        return path.to_string();
    }
    if let Some(path) = getenv(CHANGELOG_ENV) {
        if !path.trim().is_empty() {
            return path.trim().to_string();
        }
    }
    if let Some(path) = non_blank(Some(config.release.changelog.as_str())) {
        return path.to_string();
    }
    changelog::DEFAULT_PATH.to_string()
}

/// Remote name: flag, then config file/default.
pub fn resolve_remote(flag: Option<&str>, config: &Config) -> String {
    non_blank(flag)
        .unwrap_or(config.release.remote.as_str())
        .to_string()
}

/// Tag prefix: flag, then config file/default. An explicit empty prefix is kept.
pub fn resolve_tag_prefix(flag: Option<&str>, config: &Config) -> String {
    flag.unwrap_or(config.release.tag_prefix.as_str()).to_string()
}
