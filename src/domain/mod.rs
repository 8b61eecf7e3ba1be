//! Domain logic - pure release rules independent of git operations

pub mod actions;
pub mod tag;

pub use actions::{ActionRequest, ActionSet};
pub use tag::ReleaseTag;
