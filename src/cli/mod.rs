//! Programmatic entry points behind the `mdrelease` binary

pub mod orchestration;

pub use orchestration::{
    run_check, run_check_workflow, run_release, run_release_workflow, run_version_workflow,
    ReleaseOutcome, ReleaseSettings, ReleaseWorkflowArgs,
};
