//! SHA-256 content hashing and content references.

use sha2::{Digest, Sha256};

const CONTENT_REF_PREFIX: &str = "sha256:";

/// Lowercase hex SHA-256 of raw bytes.
///
/// ```
/// use codex_core::content_hash;
///
/// assert_eq!(
///     content_hash(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash an ordered list of fields.
///
/// Each field is prefixed with its length so that `("ab", "c")` and
/// `("a", "bc")` never collide.
pub fn hash_fields<I, F>(fields: I) -> String
where
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        let field = field.as_ref();
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    format!("{:x}", hasher.finalize())
}

/// Content reference for a hash, e.g. `sha256:ab12...`.
pub fn content_ref(hash: &str) -> String {
    format!("{CONTENT_REF_PREFIX}{hash}")
}

/// Extract the hash from a content reference.
///
/// Returns `None` unless the reference is `sha256:` followed by 64 lowercase
/// hex digits.
///
/// ```
/// use codex_core::{content_hash, content_ref, parse_content_ref};
///
/// let hash = content_hash(b"payload");
/// assert_eq!(parse_content_ref(&content_ref(&hash)), Some(hash.as_str()));
/// assert_eq!(parse_content_ref("blob:42"), None);
/// ```
pub fn parse_content_ref(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(CONTENT_REF_PREFIX)
        .filter(|hash| {
            hash.len() == 64
                && hash
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_separates_field_boundaries() {
        assert_ne!(hash_fields(["ab", "c"]), hash_fields(["a", "bc"]));
        assert_eq!(hash_fields(["ab", "c"]), hash_fields(["ab", "c"]));
    }

    #[test]
    fn content_ref_rejects_short_hashes() {
        assert_eq!(parse_content_ref("sha256:abc"), None);
    }
}
