//! Release workflow orchestration
//!
//! A release is a fixed, ordered list of guarded [Step]s. Each step runs at
//! most once and only when its guard holds for the resolved [ActionSet]; the
//! first failing step ends the run. Nothing already done is rolled back.
//!
//! The `run_*_workflow` functions are the programmatic entry points used by
//! the binary: they resolve settings, parse the changelog, open the
//! repository and hand over to [run_release] / [run_check], which only talk
//! to the [Repository] trait.

use tracing::{debug, info_span};

use crate::boundary::BoundaryWarning;
use crate::changelog::{self, ReleaseEntry};
use crate::config::{self, Config};
use crate::domain::{ActionRequest, ActionSet, ReleaseTag};
use crate::error::{GitError, ReleaseError, Result};
use crate::git::{ops, DryRunRepository, Git2Repository, Repository};
use crate::ui;

/// Settings shared by every step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub changelog_path: String,
    pub remote: String,
    pub tag_prefix: String,
    /// Report mutating git operations instead of running them
    pub dry_run: bool,
    /// Delete and recreate an existing release tag
    pub force_retag: bool,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        let defaults = Config::default();
        ReleaseSettings {
            changelog_path: defaults.release.changelog,
            remote: defaults.release.remote,
            tag_prefix: defaults.release.tag_prefix,
            dry_run: false,
            force_retag: false,
        }
    }
}

/// Result of a successful release run
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    pub tag: ReleaseTag,
    pub actions: ActionSet,
    pub dry_run: bool,
    /// Whether this run created the tag
    pub tag_created: bool,
    /// Mutating git commands skipped because of `dry_run`, in order
    pub planned: Vec<String>,
}

/// One guarded step of a release, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ValidateRepository,
    ValidateRemote,
    Synchronize,
    /// Force-retag deletions, or the "not yet released" check
    PrepareTag,
    /// Force-retag of an already created tag that is only being pushed
    RetagRemoteOnly,
    RequireLocalTag,
    StageAll,
    VerifyStaged,
    Commit,
    CreateTag,
    PushCommit,
    PushTag,
}

impl Step {
    pub const ORDER: [Step; 12] = [
        Step::ValidateRepository,
        Step::ValidateRemote,
        Step::Synchronize,
        Step::PrepareTag,
        Step::RetagRemoteOnly,
        Step::RequireLocalTag,
        Step::StageAll,
        Step::VerifyStaged,
        Step::Commit,
        Step::CreateTag,
        Step::PushCommit,
        Step::PushTag,
    ];

    /// Guard: whether the step belongs to a run with these actions.
    pub fn applies(self, actions: &ActionSet, settings: &ReleaseSettings) -> bool {
        match self {
            Step::ValidateRepository => true,
            Step::ValidateRemote | Step::Synchronize => actions.needs_remote(),
            Step::PrepareTag | Step::CreateTag => actions.tag,
            Step::RetagRemoteOnly => actions.push_tag && !actions.tag && settings.force_retag,
            Step::RequireLocalTag => actions.push_tag && !actions.tag,
            Step::StageAll => actions.stage_all,
            Step::VerifyStaged | Step::Commit => actions.commit,
            Step::PushCommit => actions.push_commit,
            Step::PushTag => actions.push_tag,
        }
    }
}

/// Steps a run with these actions executes, in order.
pub fn plan(actions: &ActionSet, settings: &ReleaseSettings) -> Vec<Step> {
    Step::ORDER
        .iter()
        .copied()
        .filter(|step| step.applies(actions, settings))
        .collect()
}

fn already_released(tag: &ReleaseTag, settings: &ReleaseSettings) -> String {
    format!(
        "no new changelog version to release: {} already exists (update {})",
        tag, settings.changelog_path
    )
}

/// A tag assertion that failed its own check (op `failed_check`) is an
/// operator mistake; a failing tag query is a git failure.
fn tag_assertion_error(err: GitError, failed_check: &str, message: String) -> ReleaseError {
    if err.op == failed_check {
        ReleaseError::precondition(message)
    } else {
        ReleaseError::Git(err)
    }
}

struct ReleaseRun<'a, R> {
    repo: &'a R,
    entry: &'a ReleaseEntry,
    actions: ActionSet,
    settings: &'a ReleaseSettings,
    tag: ReleaseTag,
    tag_created: bool,
}

impl<R: Repository> ReleaseRun<'_, R> {
    fn execute(&mut self, step: Step) -> Result<()> {
        debug!(?step, "running release step");
        let remote = self.settings.remote.as_str();

        match step {
            Step::ValidateRepository => self.repo.ensure_repository()?,
            Step::ValidateRemote => self.repo.ensure_remote(remote)?,
            Step::Synchronize => {
                self.repo.fetch_remote_refs(remote)?;
                self.repo.fast_forward_pull(remote)?;
            }
            Step::PrepareTag => {
                if self.settings.force_retag {
                    if self.actions.push_tag {
                        self.delete_remote_tag_if_present()?;
                    }
                    if self.repo.tag_exists_locally(self.tag.name())? {
                        ui::display_status(&format!("Deleting local tag {}...", self.tag));
                        self.repo.delete_local_tag(self.tag.name())?;
                    }
                } else if let Err(err) = self.repo.assert_tag_absent(self.tag.name()) {
                    let message = already_released(&self.tag, self.settings);
                    return Err(tag_assertion_error(err, ops::VALIDATE_TAG_ABSENCE, message));
                }
            }
            Step::RetagRemoteOnly => self.delete_remote_tag_if_present()?,
            Step::RequireLocalTag => {
                if let Err(err) = self.repo.assert_tag_present(self.tag.name()) {
                    let message = format!(
                        "cannot push tag {}: create it first with --tag (or use default mdrelease/--all)",
                        self.tag
                    );
                    return Err(tag_assertion_error(err, ops::VALIDATE_LOCAL_TAG, message));
                }
            }
            Step::StageAll => {
                ui::display_status("Staging changes...");
                self.repo.stage_all_changes()?;
            }
            Step::VerifyStaged => {
                if self.settings.dry_run && self.actions.stage_all {
                    ui::display_boundary_warning(&BoundaryWarning::StagedCheckSkipped);
                } else if !self.repo.has_staged_changes()? {
                    let message = if self.actions.stage_all {
                        format!(
                            "no changes to release after staging (update {} or make code changes)",
                            self.settings.changelog_path
                        )
                    } else {
                        "no staged changes to commit".to_string()
                    };
                    return Err(ReleaseError::precondition(message));
                }
            }
            Step::Commit => {
                ui::display_status("Committing changes...");
                self.repo
                    .commit(&self.entry.summary, &self.entry.description)?;
            }
            Step::CreateTag => {
                ui::display_status(&format!("Creating tag {}...", self.tag));
                self.repo.create_annotated_tag(
                    self.tag.name(),
                    &self.entry.summary,
                    &self.entry.description,
                )?;
                self.tag_created = true;
            }
            Step::PushCommit => {
                ui::display_status(&format!("Pushing HEAD to {}...", remote));
                self.repo.push_head(remote)?;
            }
            Step::PushTag => {
                ui::display_status(&format!("Pushing tag {} to {}...", self.tag, remote));
                if let Err(source) = self.repo.push_tag(remote, self.tag.name()) {
                    if self.tag_created {
                        return Err(ReleaseError::TagCreatedLocallyOnly {
                            tag: self.tag.to_string(),
                            source,
                        });
                    }
                    return Err(source.into());
                }
            }
        }
        Ok(())
    }

    fn delete_remote_tag_if_present(&self) -> Result<()> {
        let remote = self.settings.remote.as_str();
        if self.repo.tag_exists_on_remote(remote, self.tag.name())? {
            ui::display_status(&format!(
                "Deleting remote tag {} from {}...",
                self.tag, remote
            ));
            self.repo.delete_remote_tag(remote, self.tag.name())?;
        }
        Ok(())
    }
}

/// Cut the release described by `entry`.
///
/// Runs every step of [plan] in order against `repo` and stops at the first
/// failure. With `settings.dry_run` the repository is wrapped in a
/// [DryRunRepository], so mutating steps are only reported and returned in
/// [ReleaseOutcome::planned]; the staged-change check is then skipped when
/// staging was part of the run.
///
/// # Errors
/// * [ReleaseError::Precondition] - tag already released, tag missing for a
///   push-only run, or nothing to commit
/// * [ReleaseError::TagCreatedLocallyOnly] - this run created the tag but
///   pushing it failed
/// * [ReleaseError::Git] - any other git failure
pub fn run_release<R: Repository>(
    repo: &R,
    entry: &ReleaseEntry,
    actions: ActionSet,
    settings: &ReleaseSettings,
) -> Result<ReleaseOutcome> {
    if !settings.dry_run {
        return release_on(repo, entry, actions, settings);
    }

    let dry_run = DryRunRepository::new(repo);
    let mut outcome = release_on(&dry_run, entry, actions, settings)?;
    outcome.planned = dry_run.planned();
    Ok(outcome)
}

fn release_on<R: Repository>(
    repo: &R,
    entry: &ReleaseEntry,
    actions: ActionSet,
    settings: &ReleaseSettings,
) -> Result<ReleaseOutcome> {
    let tag = ReleaseTag::new(&settings.tag_prefix, &entry.version);
    let _span = info_span!("release", tag = %tag, dry_run = settings.dry_run).entered();

    ui::display_release_info(
        "Release info",
        &settings.changelog_path,
        entry,
        &tag,
        Some(&actions),
        settings.dry_run,
    );

    let mut run = ReleaseRun {
        repo,
        entry,
        actions,
        settings,
        tag,
        tag_created: false,
    };

    for step in plan(&actions, settings) {
        run.execute(step)?;
    }

    if actions.tag && !actions.push_tag && !settings.dry_run {
        ui::display_boundary_warning(&BoundaryWarning::TagNotPublished {
            tag: run.tag.to_string(),
            remote: settings.remote.clone(),
        });
    }

    if settings.dry_run {
        ui::display_success("Dry-run complete.");
    } else {
        ui::display_success(&format!(
            "Release complete: {} ({})",
            entry.summary, run.tag
        ));
    }

    Ok(ReleaseOutcome {
        tag: run.tag,
        actions,
        dry_run: settings.dry_run,
        tag_created: run.tag_created,
        planned: Vec::new(),
    })
}

/// Validate that `entry` can be released without changing anything.
///
/// Checks the repository, the remote, and that the release tag does not
/// exist yet. Tags are fetched first unless `settings.dry_run` is set.
pub fn run_check<R: Repository>(
    repo: &R,
    entry: &ReleaseEntry,
    settings: &ReleaseSettings,
) -> Result<ReleaseTag> {
    let tag = ReleaseTag::new(&settings.tag_prefix, &entry.version);
    let _span = info_span!("check", tag = %tag).entered();

    ui::display_release_info(
        "Release check",
        &settings.changelog_path,
        entry,
        &tag,
        None,
        settings.dry_run,
    );

    repo.ensure_repository()?;
    repo.ensure_remote(&settings.remote)?;
    if settings.dry_run {
        ui::display_status("Fetch tags: skipped in --dry-run");
    } else {
        repo.fetch_remote_tags()?;
        ui::display_success("Fetch tags: ok");
    }

    if let Err(err) = repo.assert_tag_absent(tag.name()) {
        let message = already_released(&tag, settings);
        return Err(tag_assertion_error(err, ops::VALIDATE_TAG_ABSENCE, message));
    }
    ui::display_success("Tag availability: ok");
    ui::display_success("Check passed.");

    Ok(tag)
}

/// Arguments for the release and check workflows
///
/// Mirrors the CLI flags in a form that does not depend on clap.
/// `None` means "not given on the command line".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseWorkflowArgs {
    pub config_path: Option<String>,
    pub changelog: Option<String>,
    pub remote: Option<String>,
    pub tag_prefix: Option<String>,
    pub dry_run: bool,
    pub force_retag: bool,
    pub actions: ActionRequest,
}

/// Layer flags over environment, config file and defaults.
pub fn resolve_settings<F>(args: &ReleaseWorkflowArgs, config: &Config, getenv: F) -> ReleaseSettings
where
    F: Fn(&str) -> Option<String>,
{
    ReleaseSettings {
        changelog_path: config::resolve_changelog_path(args.changelog.as_deref(), getenv, config),
        remote: config::resolve_remote(args.remote.as_deref(), config),
        tag_prefix: config::resolve_tag_prefix(args.tag_prefix.as_deref(), config),
        dry_run: args.dry_run,
        force_retag: args.force_retag,
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn open_repository() -> Result<Git2Repository> {
    Ok(Git2Repository::discover(".")?)
}

/// Full release from the command line: resolve actions (usage errors
/// first), load settings, parse the changelog, then run against the
/// repository in the current directory.
pub fn run_release_workflow(args: ReleaseWorkflowArgs) -> Result<ReleaseOutcome> {
    let actions = args.actions.resolve()?;
    let config = config::load_config(args.config_path.as_deref())?;
    let settings = resolve_settings(&args, &config, process_env);

    let entry = changelog::parse_latest(&settings.changelog_path)?;
    let repo = open_repository()?;

    run_release(&repo, &entry, actions, &settings)
}

/// `mdrelease check`: preconditions only. Action flags are ignored.
pub fn run_check_workflow(args: ReleaseWorkflowArgs) -> Result<ReleaseTag> {
    let config = config::load_config(args.config_path.as_deref())?;
    let settings = resolve_settings(&args, &config, process_env);

    let entry = changelog::parse_latest(&settings.changelog_path)?;
    let repo = open_repository()?;

    run_check(&repo, &entry, &settings)
}

/// `mdrelease version`: the latest version in the changelog.
pub fn run_version_workflow(config_path: Option<&str>, changelog: Option<&str>) -> Result<String> {
    let config = config::load_config(config_path)?;
    let path = config::resolve_changelog_path(changelog, process_env, &config);
    let entry = changelog::parse_latest(&path)?;
    Ok(entry.version)
}
