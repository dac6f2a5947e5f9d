//! CLI command definitions.

use codex::Category;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Codex - branching story checkpoints with a global artifact registry
#[derive(Parser, Debug)]
#[command(name = "codex")]
#[command(about = "Branching story checkpoints with a global artifact registry", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory (overrides the configured one)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new story
    NewStory {
        /// Genre tag, also used to suffix colliding artifact names
        #[arg(long)]
        genre: String,

        /// Story id (derived from the genre and the current time if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Record a turn on a story branch
    Continue {
        /// Story id
        story: String,

        /// Branch to advance
        #[arg(long, default_value = "main")]
        branch: String,

        /// Narrative text of the turn
        #[arg(long)]
        text: String,

        /// Artifact file; the file stem is the artifact name
        #[arg(long = "artifact")]
        artifacts: Vec<PathBuf>,

        /// Checkpoint the turn continues, for safe retries
        #[arg(long)]
        parent: Option<String>,

        /// Mark the new checkpoint as a decision point with this prompt
        #[arg(long, requires = "options")]
        decision: Option<String>,

        /// Decision option label
        #[arg(long = "option", requires = "decision")]
        options: Vec<String>,
    },

    /// Name a new branch
    Branch {
        /// Story id
        story: String,

        /// Branch name
        name: String,

        /// Checkpoint to branch from (defaults to the story head)
        #[arg(long)]
        from: Option<String>,
    },

    /// Start a new story from a checkpoint of an existing one
    Fork {
        /// Source story id
        story: String,

        /// Checkpoint to fork from (id or unambiguous prefix)
        checkpoint: String,

        /// New story id
        #[arg(long)]
        id: String,

        /// Genre of the new story (defaults to the source genre)
        #[arg(long)]
        genre: Option<String>,
    },

    /// Show the chain of checkpoints leading to a checkpoint
    Restore {
        /// Story id
        story: String,

        /// Checkpoint id or unambiguous prefix
        checkpoint: String,
    },

    /// Mark a checkpoint as a decision point
    Mark {
        /// Story id
        story: String,

        /// Checkpoint id or unambiguous prefix
        checkpoint: String,

        /// Prompt text
        #[arg(long)]
        prompt: String,

        /// Option label
        #[arg(long = "option", required = true)]
        options: Vec<String>,
    },

    /// Canonise a source branch into a target branch
    Merge {
        /// Source as `story[:branch]`
        source: String,

        /// Target as `story[:branch]`
        target: String,
    },

    /// List stories and their branches
    Stories,

    /// List decision points
    Forks {
        /// Only decision points this story can reach
        #[arg(long)]
        story: Option<String>,
    },

    /// Registry queries
    #[command(subcommand)]
    Registry(RegistryCommands),
}

impl Commands {
    /// Whether the command changes stored state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Commands::NewStory { .. }
                | Commands::Continue { .. }
                | Commands::Branch { .. }
                | Commands::Fork { .. }
                | Commands::Mark { .. }
                | Commands::Merge { .. }
        )
    }
}

/// Registry subcommands
#[derive(Subcommand, Debug)]
pub enum RegistryCommands {
    /// Case-insensitive substring search over canonical and variant names
    Search {
        /// Search term
        term: String,
    },

    /// Filter entries by category, contributing story and name
    Find {
        /// Entry category
        #[arg(long)]
        category: Option<Category>,

        /// Contributing story
        #[arg(long)]
        story: Option<String>,

        /// Name substring
        #[arg(long)]
        text: Option<String>,
    },

    /// Show one entry by canonical or variant name
    Show {
        /// Canonical or variant name
        name: String,
    },

    /// Convergence progress and category buckets
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "codex",
            "continue",
            "noir_01",
            "--text",
            "Rain again.",
            "--artifact",
            "scanner.py",
            "--artifact",
            "decoder.py",
            "--decision",
            "Which door?",
            "--option",
            "left",
            "--option",
            "right",
        ])
        .unwrap();

        match cli.command {
            Commands::Continue {
                branch,
                artifacts,
                options,
                decision,
                ..
            } => {
                assert_eq!(branch, "main");
                assert_eq!(artifacts.len(), 2);
                assert_eq!(options, vec!["left", "right"]);
                assert_eq!(decision.as_deref(), Some("Which door?"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decision_needs_options() {
        let parsed = Cli::try_parse_from([
            "codex", "continue", "noir_01", "--text", "x", "--decision", "Which?",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "codex",
            "registry",
            "search",
            "scan",
            "--json",
            "--data-dir",
            "/tmp/codex",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/codex")));
        assert!(!cli.command.is_mutating());
    }

    #[test]
    fn category_filter_parses() {
        let cli =
            Cli::try_parse_from(["codex", "registry", "find", "--category", "crypto"]).unwrap();
        match cli.command {
            Commands::Registry(RegistryCommands::Find { category, .. }) => {
                assert_eq!(category, Some(Category::Crypto));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = Cli::try_parse_from(["codex", "registry", "find", "--category", "magic"])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown category 'magic'"));
    }
}
