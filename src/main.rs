use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mdrelease::changelog;
use mdrelease::cli::{self, ReleaseWorkflowArgs};
use mdrelease::domain::ActionRequest;
use mdrelease::error::{ReleaseError, EXIT_OK};
use mdrelease::ui;
use mdrelease::version;

#[derive(Parser)]
#[command(
    name = "mdrelease",
    about = "Commit, tag and push a release described by the latest changelog entry",
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    release: ReleaseArgs,

    #[arg(short = 'V', long = "version", help = "Print version information")]
    version: bool,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Cut a release (the default when no command is given)
    Release(ReleaseArgs),
    /// Check that the latest changelog entry can be released
    Check(TargetArgs),
    /// Print the latest version in the changelog
    Version(VersionArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
struct TargetArgs {
    #[arg(long, help = "Changelog file (default: changelog.md)")]
    changelog: Option<String>,

    #[arg(long, help = "Git remote to use (default: origin)")]
    remote: Option<String>,

    #[arg(long, help = "Prefix of the release tag (default: v)")]
    tag_prefix: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Print mutating git commands instead of running them")]
    dry_run: bool,
}

impl TargetArgs {
    fn into_workflow(self, actions: ActionRequest, force_retag: bool) -> ReleaseWorkflowArgs {
        ReleaseWorkflowArgs {
            config_path: self.config,
            changelog: self.changelog,
            remote: self.remote,
            tag_prefix: self.tag_prefix,
            dry_run: self.dry_run,
            force_retag,
            actions,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
struct ReleaseArgs {
    #[arg(long, help = "Run every release step (the default)")]
    all: bool,

    #[arg(long, help = "Stage all changes")]
    stage_all: bool,

    #[arg(long, help = "Commit staged changes")]
    commit: bool,

    #[arg(long, help = "Create the annotated release tag")]
    tag: bool,

    #[arg(long, help = "Push HEAD and the release tag")]
    push: bool,

    #[arg(long, help = "Push HEAD")]
    push_commit: bool,

    #[arg(long, help = "Push the release tag")]
    push_tag: bool,

    #[arg(long, help = "Delete and recreate the release tag if it exists")]
    force_retag: bool,

    #[command(flatten)]
    target: TargetArgs,
}

impl ReleaseArgs {
    fn into_workflow(self) -> ReleaseWorkflowArgs {
        let actions = ActionRequest {
            all: self.all,
            stage_all: self.stage_all,
            commit: self.commit,
            tag: self.tag,
            push: self.push,
            push_commit: self.push_commit,
            push_tag: self.push_tag,
        };
        self.target.into_workflow(actions, self.force_retag)
    }
}

#[derive(Args, Debug, Clone, Default)]
struct VersionArgs {
    #[arg(long, help = "Changelog file (default: changelog.md)")]
    changelog: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose {
        "mdrelease=debug"
    } else {
        "mdrelease=warn"
    };
    let filter = if verbose {
        EnvFilter::try_new(default_directive)?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

/// Release flags given before a subcommand belong to no command.
fn select_command(command: Option<Command>, release: ReleaseArgs) -> mdrelease::Result<Command> {
    match command {
        None => Ok(Command::Release(release)),
        Some(_) if release != ReleaseArgs::default() => Err(ReleaseError::usage(
            "release flags must follow the subcommand (e.g. mdrelease release --tag)",
        )),
        Some(command) => Ok(command),
    }
}

fn run(opts: Cli, tool_version: &str) -> mdrelease::Result<()> {
    if opts.version {
        ui::display_plain(&version::version_line(tool_version));
        return Ok(());
    }

    match select_command(opts.command, opts.release)? {
        Command::Release(args) => {
            cli::run_release_workflow(args.into_workflow())?;
        }
        Command::Check(args) => {
            cli::run_check_workflow(args.into_workflow(ActionRequest::default(), false))?;
        }
        Command::Version(args) => {
            let latest =
                cli::run_version_workflow(args.config.as_deref(), args.changelog.as_deref())?;
            ui::display_plain(&latest);
        }
    }
    Ok(())
}

fn report(err: &ReleaseError) {
    ui::display_error(&err.to_string());
    if let ReleaseError::Parse(parse) = err {
        ui::display_plain(&format!(
            "Expected format example in {}: {}",
            parse.path,
            changelog::EXPECTED_FORMAT
        ));
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Cli::parse();
    init_logging(opts.verbose)?;

    let tool_version = version::tool_version();
    tracing::debug!(%tool_version, "starting");

    let code = match run(opts, &tool_version) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            report(&err);
            err.exit_code()
        }
    };
    std::process::exit(code)
}
