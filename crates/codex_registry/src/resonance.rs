//! Compatible-artifact lookup.

use crate::state::RegistryState;
use serde::{Deserialize, Serialize};

/// Keyword pairs: an artifact whose name contains the keyword resonates with
/// entries whose canonical name contains one of the matches.
pub const COMPATIBLE_PAIRS: &[(&str, &[&str])] = &[
    ("encoder", &["decoder", "decryptor", "parser"]),
    ("decoder", &["encoder", "encryptor", "generator"]),
    ("scanner", &["analyzer", "detector", "monitor"]),
    ("analyzer", &["scanner", "parser", "detector"]),
    ("detector", &["scanner", "analyzer", "monitor"]),
    ("monitor", &["tracker", "detector", "watcher"]),
    ("tracker", &["monitor", "locator", "finder"]),
    ("generator", &["parser", "builder", "creator"]),
    ("parser", &["generator", "analyzer", "reader"]),
    ("transmitter", &["receiver", "broadcaster", "sender"]),
    ("receiver", &["transmitter", "listener", "collector"]),
    ("client", &["server", "connector", "requester"]),
    ("server", &["client", "handler", "responder"]),
    ("reader", &["writer", "parser", "loader"]),
    ("writer", &["reader", "generator", "saver"]),
    ("finder", &["tracker", "locator", "searcher"]),
    ("breaker", &["maker", "cracker", "bypasser"]),
    ("maker", &["breaker", "builder", "creator"]),
];

/// An entry compatible with a queried artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resonance {
    /// Matching entry
    pub entry_id: String,
    /// Canonical name of the matching entry
    pub canonical_name: String,
    /// Stories that contributed to the entry
    pub stories: Vec<String>,
    /// Label such as `encoder <-> decoder`
    pub resonance: String,
}

pub(crate) fn find(state: &RegistryState, name: &str) -> Vec<Resonance> {
    let name = name.to_lowercase();
    let mut found = Vec::new();
    for (keyword, matches) in COMPATIBLE_PAIRS {
        if !name.contains(keyword) {
            continue;
        }
        for entry in state.entries.values() {
            let Some(matched) = matches
                .iter()
                .find(|m| entry.canonical_name().contains(*m))
            else {
                continue;
            };
            found.push(Resonance {
                entry_id: entry.id().clone(),
                canonical_name: entry.canonical_name().clone(),
                stories: entry.stories().into_iter().collect(),
                resonance: format!("{} <-> {}", keyword, matched),
            });
        }
    }
    found
}
