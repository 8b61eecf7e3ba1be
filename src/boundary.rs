use std::fmt;

/// Non-fatal conditions reported to the operator while a release runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Staging was simulated, so the staged-change check cannot run
    StagedCheckSkipped,
    /// The tag is left in the local repository only
    TagNotPublished { tag: String, remote: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::StagedCheckSkipped => {
                write!(
                    f,
                    "Skipping staged-change verification in --dry-run after --stage-all"
                )
            }
            BoundaryWarning::TagNotPublished { tag, remote } => {
                write!(
                    f,
                    "Tag {} exists locally but was not pushed; to publish it run: {}",
                    tag,
                    crate::ui::format_manual_push_instruction(tag, remote)
                )
            }
        }
    }
}
