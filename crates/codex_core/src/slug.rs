//! Name normalisation.

use crate::Category;
use chrono::{DateTime, Utc};

/// Normalise a name into a registry slug.
///
/// Lowercases, turns spaces and hyphens into underscores, drops everything
/// outside `[a-z0-9_]`, collapses underscore runs and trims underscores.
///
/// ```
/// use codex_core::slugify;
///
/// assert_eq!(slugify("Signal Decoder"), "signal_decoder");
/// assert_eq!(slugify("--Neon__Scanner!--"), "neon_scanner");
/// assert_eq!(slugify("???"), "");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = match c {
            ' ' | '-' | '_' => '_',
            'a'..='z' | '0'..='9' => c,
            _ => continue,
        };
        if c == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        slug.push(c);
    }
    slug.trim_matches('_').to_string()
}

/// Tag used to suffix colliding variant names for a story.
///
/// The first segment of the slugged genre, or the category name when the
/// genre has no usable characters.
///
/// ```
/// use codex_core::{story_tag, Category};
///
/// assert_eq!(story_tag("Western Mystery", Category::Crypto), "western");
/// assert_eq!(story_tag("", Category::Crypto), "crypto");
/// ```
pub fn story_tag(genre: &str, fallback: Category) -> String {
    let slug = slugify(genre);
    match slug.split('_').next() {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => fallback.as_str().to_string(),
    }
}

/// Story id derived from a genre and a start time: `<genre>_<YYYYMMDD_HHMMSS>`.
pub fn session_story_id(genre: &str, started: DateTime<Utc>) -> String {
    let genre = slugify(genre);
    let genre = if genre.is_empty() { "story" } else { &genre };
    format!("{}_{}", genre, started.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slug_is_idempotent() {
        let once = slugify("Cyber-Punk  Decoder v2");
        assert_eq!(once, "cyber_punk_decoder_v2");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn session_id_uses_utc_timestamp() {
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            session_story_id("Neo Noir", started),
            "neo_noir_20240309_070501"
        );
        assert_eq!(session_story_id("!!", started), "story_20240309_070501");
    }
}
