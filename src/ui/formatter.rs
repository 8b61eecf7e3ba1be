//! Formatting functions for terminal output.
//!
//! The `format_*` functions are pure and return strings; the `display_*`
//! functions print them with `console` styling.

use console::style;

use crate::boundary::BoundaryWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a plain line of output (no decoration), e.g. a bare version number.
pub fn display_plain(message: &str) {
    println!("{}", message);
}

/// Report a mutating git command that dry-run mode skipped.
pub fn display_dry_run(command: &str) {
    println!("{} {}", style("[dry-run]").cyan(), command);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// A labelled block of `key: value` lines.
///
/// ```text
/// Release info:
///   Changelog: changelog.md
///   Version: 1.2.3
/// ```
pub fn format_block(heading: &str, rows: &[(&str, String)]) -> String {
    let mut out = format!("{}:\n", heading);
    for (label, value) in rows {
        out.push_str(&format!("  {}: {}\n", label, value));
    }
    out
}

/// Display a block built by [format_block] with a bold heading.
pub fn display_block(heading: &str, rows: &[(&str, String)]) {
    let text = format_block(heading, rows);
    let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    println!("{}", style(format!("{}:", heading)).bold());
    print!("{}", body);
}

/// Shell command that pushes a tag by hand.
pub fn format_manual_push_instruction(tag: &str, remote: &str) -> String {
    format!("git push {} {}", remote, tag)
}
