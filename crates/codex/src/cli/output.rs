//! Human or JSON output.

use codex::{CodexResult, JsonError};
use serde::Serialize;

/// Prints command results in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    /// Printer for `--json` or human output.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print a result: pretty JSON, or the lines `human` renders.
    pub fn print<T: Serialize>(&self, value: &T, human: impl FnOnce(&T) -> Vec<String>) -> CodexResult<()> {
        if self.json {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        } else {
            for line in human(value) {
                println!("{}", line);
            }
        }
        Ok(())
    }
}
