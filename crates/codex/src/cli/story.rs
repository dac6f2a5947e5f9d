//! Story command handlers.

use super::Printer;
use codex::{CheckpointId, CodexResult, DecisionPoint, Turn, TurnReport, Workspace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments of `continue`.
#[derive(Debug)]
pub struct ContinueRequest {
    pub story: String,
    pub branch: String,
    pub text: String,
    pub artifacts: Vec<PathBuf>,
    pub parent: Option<String>,
    pub decision: Option<(String, Vec<String>)>,
}

/// Handle `new-story`.
pub fn new_story(
    workspace: &Workspace,
    printer: &Printer,
    genre: &str,
    id: Option<&str>,
) -> CodexResult<()> {
    let story = workspace.codex().new_story(id, genre)?;
    printer.print(&story, |story| {
        vec![format!("Created story {} (genre '{}')", story.id(), story.genre())]
    })
}

/// Handle `continue`.
pub async fn continue_story(
    workspace: &Workspace,
    printer: &Printer,
    request: ContinueRequest,
) -> CodexResult<()> {
    let codex = workspace.codex();
    let payload_ref = workspace.store_payload(&request.text).await?;
    let mut turn = Turn::new(payload_ref);
    for path in &request.artifacts {
        turn = turn.with_artifact(workspace.artifact_from_file(path).await?);
    }
    if let Some(parent) = &request.parent {
        turn = turn.with_parent(codex.resolve_checkpoint(&request.story, parent)?);
    }
    if let Some((prompt, options)) = request.decision {
        turn = turn.with_decision(prompt, options);
    }

    let report = codex.continue_story(&request.story, &request.branch, turn)?;
    printer.print(&report, render_turn)
}

fn render_turn(report: &TurnReport) -> Vec<String> {
    let verb = if report.created { "Recorded" } else { "Already recorded" };
    let mut lines = vec![format!(
        "{} checkpoint {} on {}:{} (sequence {})",
        verb,
        report.checkpoint.short(),
        report.story_id,
        report.branch,
        report.sequence
    )];
    for assignment in &report.assignments {
        let note = if assignment.counted { "" } else { " (already counted)" };
        lines.push(format!(
            "  artifact {} -> {} v{} [entry {}]{}",
            assignment.key.slug, assignment.variant, assignment.version, assignment.entry_id, note
        ));
    }
    for rename in &report.renamed {
        lines.push(format!("  renamed {} -> {}", rename.from, rename.to));
    }
    for event in &report.events {
        lines.push(format!(
            "  convergence: threshold {} crossed at {} artifacts (trigger {})",
            event.threshold(),
            event.total_at_crossing(),
            event.trigger_entry()
        ));
    }
    if let Some(decision) = &report.decision {
        lines.push(format!(
            "  decision: {} [{}]",
            decision.prompt(),
            decision.options().join(" | ")
        ));
    }
    lines
}

/// Handle `branch`.
pub fn branch(
    workspace: &Workspace,
    printer: &Printer,
    story: &str,
    name: &str,
    from: Option<&str>,
) -> CodexResult<()> {
    let codex = workspace.codex();
    let from = from
        .map(|prefix| codex.resolve_checkpoint(story, prefix))
        .transpose()?;
    let branch = codex.branch(story, name, from.as_ref())?;
    let head = codex.head(story, name)?;
    printer.print(&(branch, head), |(branch, head)| {
        vec![format!("Created branch {} at {}", branch, head.short())]
    })
}

/// Handle `fork`.
pub fn fork(
    workspace: &Workspace,
    printer: &Printer,
    story: &str,
    checkpoint: &str,
    id: &str,
    genre: Option<&str>,
) -> CodexResult<()> {
    let codex = workspace.codex();
    let from = codex.resolve_checkpoint(story, checkpoint)?;
    let forked = codex.fork(story, &from, id, genre)?;
    printer.print(&forked, |forked| {
        vec![format!(
            "Forked {} from {} at {} (genre '{}')",
            forked.id(),
            story,
            from.short(),
            forked.genre()
        )]
    })
}

/// Handle `restore`.
pub fn restore(
    workspace: &Workspace,
    printer: &Printer,
    story: &str,
    checkpoint: &str,
) -> CodexResult<()> {
    let codex = workspace.codex();
    let id = codex.resolve_checkpoint(story, checkpoint)?;
    let chain = codex.restore(story, &id)?;
    printer.print(&chain, |chain| {
        let mut lines = Vec::new();
        for restored in chain {
            let checkpoint = &restored.checkpoint;
            let mut line = format!(
                "{:>4} {} {}",
                checkpoint.sequence(),
                checkpoint.id().short(),
                checkpoint.payload_ref()
            );
            if let Some(origin) = checkpoint.origin() {
                line.push_str(&format!(" (canonised from {})", origin.short()));
            }
            lines.push(line);
            if let Some(decision) = &restored.decision {
                lines.push(format!(
                    "       decision: {} [{}]",
                    decision.prompt(),
                    decision.options().join(" | ")
                ));
            }
            if !restored.variants.is_empty() {
                lines.push(format!("       artifacts: {}", restored.variants.join(", ")));
            }
        }
        lines
    })
}

/// Handle `mark`.
pub fn mark(
    workspace: &Workspace,
    printer: &Printer,
    story: &str,
    checkpoint: &str,
    prompt: &str,
    options: Vec<String>,
) -> CodexResult<()> {
    let codex = workspace.codex();
    let id = codex.resolve_checkpoint(story, checkpoint)?;
    let decision = codex.mark(&id, prompt, options)?;
    printer.print(&ForkView::new(id, decision), |view| {
        vec![format!("Marked {} as a decision point", view.checkpoint.short())]
    })
}

#[derive(Debug, Serialize)]
struct ForkView {
    checkpoint: CheckpointId,
    prompt: String,
    options: Vec<String>,
}

impl ForkView {
    fn new(checkpoint: CheckpointId, decision: DecisionPoint) -> Self {
        Self {
            checkpoint,
            prompt: decision.prompt().clone(),
            options: decision.options().clone(),
        }
    }
}

/// Handle `forks`.
pub fn forks(workspace: &Workspace, printer: &Printer, story: Option<&str>) -> CodexResult<()> {
    let codex = workspace.codex();
    let mut views = Vec::new();
    for id in codex.forks(story)? {
        if let Some(decision) = codex.decisions().decision(&id)? {
            views.push(ForkView::new(id, decision));
        }
    }
    printer.print(&views, |views| {
        if views.is_empty() {
            return vec!["No decision points".to_string()];
        }
        views
            .iter()
            .map(|view| {
                format!(
                    "{} {} [{}]",
                    view.checkpoint.short(),
                    view.prompt,
                    view.options.join(" | ")
                )
            })
            .collect()
    })
}

#[derive(Debug, Serialize)]
struct StoryView {
    id: String,
    genre: String,
    checkpoints: usize,
    branches: BTreeMap<String, CheckpointId>,
}

/// Handle `stories`.
pub fn stories(workspace: &Workspace, printer: &Printer) -> CodexResult<()> {
    let views: Vec<StoryView> = workspace
        .codex()
        .log()
        .stories()?
        .into_iter()
        .map(|story| StoryView {
            id: story.id().clone(),
            genre: story.genre().clone(),
            checkpoints: story.known().len(),
            branches: story.branches().clone(),
        })
        .collect();
    printer.print(&views, |views| {
        let mut lines = Vec::new();
        for view in views {
            lines.push(format!(
                "{} ({}, {} checkpoints)",
                view.id, view.genre, view.checkpoints
            ));
            for (name, head) in &view.branches {
                lines.push(format!("  {} -> {}", name, head.short()));
            }
        }
        lines
    })
}
