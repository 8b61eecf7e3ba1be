// tests/config_test.rs
use std::io::Write;

use serial_test::serial;
use tempfile::{NamedTempFile, TempDir};

use mdrelease::cli::orchestration::{resolve_settings, ReleaseWorkflowArgs};
use mdrelease::config::{
    load_config, resolve_changelog_path, Config, CHANGELOG_ENV, LOCAL_CONFIG_FILE,
};
use mdrelease::error::{ReleaseError, EXIT_GENERAL};

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Runs `f` with the current directory switched to `dir`.
fn in_dir<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir).unwrap();
    let result = f();
    std::env::set_current_dir(previous).unwrap();
    result
}

#[test]
fn test_load_from_file() {
    let temp_file = write_config(
        r#"
[release]
changelog = "docs/CHANGES.md"
remote = "upstream"
tag_prefix = ""
"#,
    );

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.release.changelog, "docs/CHANGES.md");
    assert_eq!(config.release.remote, "upstream");
    assert_eq!(config.release.tag_prefix, "");
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = load_config(Some(path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(_)));
    assert!(err.to_string().contains("cannot read"));
    assert_eq!(err.exit_code(), EXIT_GENERAL);
}

#[test]
fn test_invalid_file_is_error() {
    let temp_file = write_config("[release]\nremote = [\"a\", \"b\"]\n");

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error: invalid"));
}

#[test]
#[serial]
fn test_local_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(LOCAL_CONFIG_FILE),
        "[release]\ntag_prefix = \"release-\"\n",
    )
    .unwrap();

    let config = in_dir(dir.path(), || load_config(None)).unwrap();
    assert_eq!(config.release.tag_prefix, "release-");
    assert_eq!(config.release.remote, "origin");
}

#[test]
#[serial]
fn test_environment_overrides_config_file() {
    let mut config = Config::default();
    config.release.changelog = "docs/CHANGES.md".to_string();

    std::env::set_var(CHANGELOG_ENV, "HISTORY.md");
    let from_env = resolve_changelog_path(None, |key| std::env::var(key).ok(), &config);
    let from_flag =
        resolve_changelog_path(Some("NEWS.md"), |key| std::env::var(key).ok(), &config);
    std::env::remove_var(CHANGELOG_ENV);
    let from_config = resolve_changelog_path(None, |key| std::env::var(key).ok(), &config);

    assert_eq!(from_env, "HISTORY.md");
    assert_eq!(from_flag, "NEWS.md");
    assert_eq!(from_config, "docs/CHANGES.md");
}

#[test]
#[serial]
fn test_blank_environment_value_is_ignored() {
    std::env::set_var(CHANGELOG_ENV, "  ");
    let path = resolve_changelog_path(None, |key| std::env::var(key).ok(), &Config::default());
    std::env::remove_var(CHANGELOG_ENV);

    assert_eq!(path, "changelog.md");
}

#[test]
fn test_workflow_settings_from_config_file() {
    let temp_file = write_config("[release]\nremote = \"upstream\"\ntag_prefix = \"r\"\n");
    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();

    let args = ReleaseWorkflowArgs {
        remote: Some("fork".to_string()),
        force_retag: true,
        ..Default::default()
    };
    let settings = resolve_settings(&args, &config, |_| None);

    assert_eq!(settings.remote, "fork");
    assert_eq!(settings.tag_prefix, "r");
    assert_eq!(settings.changelog_path, "changelog.md");
    assert!(settings.force_retag);
    assert!(!settings.dry_run);
}
