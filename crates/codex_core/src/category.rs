//! Artifact categories and classification strategies.

use codex_error::{RegistryError, RegistryErrorKind};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Thematic bucket an artifact falls into.
///
/// Declaration order is the tie-break order used by [`KeywordClassifier`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Scanners, analyzers, detectors
    #[display("analysis")]
    Analysis,
    /// Ciphers, encoders, decoders
    #[display("crypto")]
    Crypto,
    /// Sockets, protocols, network clients
    #[display("network")]
    Network,
    /// Generators, synthesizers, procedural builders
    #[display("generation")]
    Generation,
    /// Monitors, watchers, trackers
    #[display("monitoring")]
    Monitoring,
    /// Anything the classifier cannot place
    #[display("other")]
    Other,
}

impl Category {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Analysis => "analysis",
            Category::Crypto => "crypto",
            Category::Network => "network",
            Category::Generation => "generation",
            Category::Monitoring => "monitoring",
            Category::Other => "other",
        }
    }

    /// All categories in declaration order.
    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }
}

impl std::str::FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| RegistryError::new(RegistryErrorKind::UnknownCategory(s.to_string())))
    }
}

/// Strategy that buckets artifact content into a [`Category`].
///
/// Classification looks at content shape only; the authored name plays no
/// part.
pub trait Classifier: Send + Sync {
    /// Classify raw artifact content.
    fn classify(&self, content: &[u8]) -> Category;
}

/// Default classifier: counts structural keywords per category.
///
/// The category with the most keyword hits wins; ties go to the earlier
/// category; no hits at all is [`Category::Other`].
///
/// # Examples
///
/// ```
/// use codex_core::{Category, Classifier, KeywordClassifier};
///
/// let classifier = KeywordClassifier::default();
/// assert_eq!(classifier.classify(b"fn decode(cipher: &[u8])"), Category::Crypto);
/// assert_eq!(classifier.classify(b"print('hello')"), Category::Other);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct KeywordClassifier {
    /// Keywords per category, matched as lowercase substrings
    table: Vec<(Category, Vec<String>)>,
}

impl KeywordClassifier {
    /// Create a classifier from an explicit keyword table.
    pub fn new(table: Vec<(Category, Vec<String>)>) -> Self {
        Self { table }
    }

    fn score(&self, category: Category, text: &str) -> usize {
        self.table
            .iter()
            .filter(|(c, _)| *c == category)
            .flat_map(|(_, keywords)| keywords.iter())
            .map(|keyword| text.matches(keyword.as_str()).count())
            .sum()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let table = [
            (Category::Analysis, &["scan", "analyz", "analys", "detect", "inspect"][..]),
            (Category::Crypto, &["crypt", "decod", "encod", "cipher", "hash"][..]),
            (Category::Network, &["socket", "http", "api", "packet", "net"][..]),
            (
                Category::Generation,
                &["generat", "synth", "random", "render", "template"][..],
            ),
            (Category::Monitoring, &["monitor", "watch", "alert", "track", "heartbeat"][..]),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(category, words)| {
                    (category, words.iter().map(|w| w.to_string()).collect())
                })
                .collect(),
        )
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, content: &[u8]) -> Category {
        let text = String::from_utf8_lossy(content).to_lowercase();
        let mut best = (Category::Other, 0);
        for category in Category::iter().filter(|c| *c != Category::Other) {
            let score = self.score(category, &text);
            if score > best.1 {
                best = (category, score);
            }
        }
        best.0
    }
}
