//! CLI output formatting

use crate::core::{MinorLine, PipelineSpec};
use crate::sync::{SyncAction, SyncOutcome};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One-line summary of a synthesised pipeline
pub fn format_plan_summary(spec: &PipelineSpec, version_count: usize) -> String {
    format!(
        "{} {} versions -> {} tasks, {} finally",
        INFO,
        style(version_count).cyan(),
        style(spec.tasks.len()).cyan(),
        style(spec.finally.len()).cyan()
    )
}

/// Summary of a finished sync
pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    let action = match outcome.action {
        SyncAction::Created => style("created").green(),
        SyncAction::Updated => style("updated").yellow(),
    };
    format!(
        "{} Pipeline {} {}\n{} Triggered run {}",
        CHECK,
        style(outcome.pipeline.name().unwrap_or_default()).bold(),
        action,
        ROCKET,
        style(&outcome.run_name).bold()
    )
}

/// A minor line and its retained versions
pub fn format_minor_line(line: &MinorLine) -> String {
    format!(
        "  {}: {}",
        style(format!("{}.{}", line.major, line.minor)).bold(),
        style(line.joined()).dim()
    )
}
