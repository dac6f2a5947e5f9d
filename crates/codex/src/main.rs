//! Codex CLI binary.
//!
//! This binary provides command-line access to the Codex:
//! - Start, continue, branch and fork stories
//! - Restore checkpoint chains and list decision points
//! - Canonise forks back into their origin
//! - Query the artifact registry and convergence progress

use clap::Parser;
use codex::{CodexConfig, CodexResult, Workspace, init_logging};
use std::process::ExitCode;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(class = %err.class(), "{}", err);
            eprintln!("Error: {}", err);
            ExitCode::from(u8::try_from(err.class().exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: cli::Cli) -> CodexResult<()> {
    let mut config = CodexConfig::load()?;
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    init_logging(config.logging(), cli.verbose)?;

    let workspace = Workspace::open(&config).await?;
    let printer = cli::Printer::new(cli.json);
    let mutating = cli.command.is_mutating();
    cli::dispatch(&workspace, &printer, cli.command).await?;
    if mutating {
        workspace.commit().await?;
    }
    Ok(())
}
