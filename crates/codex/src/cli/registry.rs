//! Registry command handlers.

use super::{Printer, RegistryCommands};
use codex::{
    ArtifactFilter, Category, CodexResult, ConvergenceStatus, RegistryEntry, Resonance, Workspace,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Handle registry subcommands.
pub fn handle(workspace: &Workspace, printer: &Printer, command: RegistryCommands) -> CodexResult<()> {
    let registry = workspace.codex().registry();
    match command {
        RegistryCommands::Search { term } => {
            let entries: Vec<RegistryEntry> = registry.search(&term)?.collect();
            printer.print(&entries, |entries| render_entries(entries))
        }
        RegistryCommands::Find {
            category,
            story,
            text,
        } => {
            let mut filter = ArtifactFilter::default();
            if let Some(category) = category {
                filter = filter.with_category(category);
            }
            if let Some(story) = story {
                filter = filter.with_story(story);
            }
            if let Some(text) = text {
                filter = filter.with_text(text);
            }
            let entries: Vec<RegistryEntry> = registry.find(filter)?.collect();
            printer.print(&entries, |entries| render_entries(entries))
        }
        RegistryCommands::Show { name } => {
            let entry = registry.lookup(&name)?;
            let resonances = registry.resonances(entry.id())?;
            let view = EntryView { entry, resonances };
            printer.print(&view, render_entry)
        }
        RegistryCommands::Status => {
            let view = StatusView {
                status: registry.status()?,
                categories: registry.category_counts()?,
            };
            printer.print(&view, render_status)
        }
    }
}

fn render_entries(entries: &[RegistryEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No matching entries".to_string()];
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} [{}] {}",
                entry.id(),
                entry.category(),
                entry.variants().join(", ")
            )
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct EntryView {
    entry: RegistryEntry,
    resonances: Vec<Resonance>,
}

fn render_entry(view: &EntryView) -> Vec<String> {
    let entry = &view.entry;
    let mut lines = vec![format!("{} [{}]", entry.id(), entry.category())];
    for variant in entry.variants() {
        let stories: Vec<&str> = entry
            .contributors_of(variant)
            .map(|contributors| contributors.iter().map(|c| c.story_id.as_str()).collect())
            .unwrap_or_default();
        let hash = entry
            .hash_of(variant)
            .and_then(|h| h.get(..12))
            .unwrap_or("?");
        let versions = entry.versions_of(variant).map_or(0, <[_]>::len);
        lines.push(format!(
            "  {} {} v{} ({})",
            variant,
            hash,
            versions,
            stories.join(", ")
        ));
    }
    for resonance in &view.resonances {
        lines.push(format!(
            "  resonates with {} ({})",
            resonance.canonical_name, resonance.resonance
        ));
    }
    lines
}

#[derive(Debug, Serialize)]
struct StatusView {
    status: ConvergenceStatus,
    categories: BTreeMap<Category, u64>,
}

fn render_status(view: &StatusView) -> Vec<String> {
    let status = &view.status;
    let mut lines = vec![format!("Artifacts: {}", status.current_artifacts)];
    match status.next_threshold {
        Some(next) => lines.push(format!(
            "Next threshold: {} ({:.0}%)",
            next,
            status.progress_to_next * 100.0
        )),
        None => lines.push("Every threshold crossed".to_string()),
    }
    lines.push(format!(
        "Pattern completion: {:.0}%",
        status.pattern_completion * 100.0
    ));
    for (category, count) in &view.categories {
        lines.push(format!("  {}: {}", category, count));
    }
    lines
}
