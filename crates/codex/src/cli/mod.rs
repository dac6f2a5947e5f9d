//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the codex binary.

mod commands;
mod merge;
mod output;
mod registry;
mod story;

pub use commands::{Cli, Commands, RegistryCommands};
pub use output::Printer;

use codex::{CodexResult, Workspace};

/// Run one command against an opened workspace.
pub async fn dispatch(workspace: &Workspace, printer: &Printer, command: Commands) -> CodexResult<()> {
    match command {
        Commands::NewStory { genre, id } => story::new_story(workspace, printer, &genre, id.as_deref()),
        Commands::Continue {
            story,
            branch,
            text,
            artifacts,
            parent,
            decision,
            options,
        } => {
            let request = story::ContinueRequest {
                story,
                branch,
                text,
                artifacts,
                parent,
                decision: decision.map(|prompt| (prompt, options)),
            };
            story::continue_story(workspace, printer, request).await
        }
        Commands::Branch { story, name, from } => {
            story::branch(workspace, printer, &story, &name, from.as_deref())
        }
        Commands::Fork {
            story,
            checkpoint,
            id,
            genre,
        } => story::fork(workspace, printer, &story, &checkpoint, &id, genre.as_deref()),
        Commands::Restore { story, checkpoint } => {
            story::restore(workspace, printer, &story, &checkpoint)
        }
        Commands::Mark {
            story,
            checkpoint,
            prompt,
            options,
        } => story::mark(workspace, printer, &story, &checkpoint, &prompt, options),
        Commands::Merge { source, target } => merge::merge(workspace, printer, &source, &target),
        Commands::Stories => story::stories(workspace, printer),
        Commands::Forks { story } => story::forks(workspace, printer, story.as_deref()),
        Commands::Registry(command) => registry::handle(workspace, printer, command),
    }
}
