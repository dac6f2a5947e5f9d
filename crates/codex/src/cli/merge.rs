//! Merge command handler.

use super::Printer;
use codex::{BranchRef, CodexResult, MergeReport, Workspace};

/// Handle `merge`.
pub fn merge(workspace: &Workspace, printer: &Printer, source: &str, target: &str) -> CodexResult<()> {
    let source: BranchRef = source.parse()?;
    let target: BranchRef = target.parse()?;
    let report = workspace.codex().merge(&source, &target)?;
    printer.print(&report, render_merge)
}

fn render_merge(report: &MergeReport) -> Vec<String> {
    if report.checkpoints_merged == 0 {
        return vec![format!(
            "{} already holds the history of {}",
            report.target, report.source
        )];
    }
    let marked = if report.fork_point_marked {
        " (decision point)"
    } else {
        ""
    };
    let mut lines = vec![
        format!(
            "Merged {} into {}: {} checkpoints",
            report.source, report.target, report.checkpoints_merged
        ),
        format!("  fork point {}{}", report.fork_point.short(), marked),
        format!(
            "  artifacts: {} canonical, {} variant",
            report.artifacts_canonical, report.artifacts_variant
        ),
    ];
    for rename in &report.renamed {
        lines.push(format!("  renamed {} -> {}", rename.from, rename.to));
    }
    for event in &report.threshold_events {
        lines.push(format!(
            "  convergence: threshold {} crossed at {} artifacts (trigger {})",
            event.threshold(),
            event.total_at_crossing(),
            event.trigger_entry()
        ));
    }
    lines
}
