//! Content hashing for change detection (§4.4 step 3).
//!
//! Grounded in `original_source/core/feeds_rss.py::_create_content_hash`: the
//! same pipe-joined tuple, hashed with MD5 (kept exactly as specified, not
//! upgraded to SHA-256 — this hash has no security role, only change detection,
//! and the format must stay stable for entries already recorded).

use md5::{Digest, Md5};

/// One parsed feed entry's fields relevant to the content hash.
pub struct HashableEntry<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub description: &'a str,
    pub link: &'a str,
    /// Any additional extracted media/content URLs for this entry.
    pub content_values: &'a [String],
}

/// `md5(title|summary|description|link|content_values)`, where `content_values`
/// is the newline-joined set of extra media URLs (§4.4 note).
#[must_use]
pub fn content_hash(entry: &HashableEntry<'_>) -> String {
    let content_values = entry.content_values.join("\n");
    let joined = [
        entry.title,
        entry.summary,
        entry.description,
        entry.link,
        content_values.as_str(),
    ]
    .join("|");

    let mut hasher = Md5::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_changes_when_any_field_changes() {
        let base = HashableEntry {
            title: "Title",
            summary: "Summary",
            description: "Description",
            link: "https://example.com/post",
            content_values: &[],
        };
        let changed = HashableEntry {
            title: "Title!",
            ..base
        };
        assert_ne!(content_hash(&base), content_hash(&changed));
    }

    #[test]
    fn hash_is_deterministic() {
        let entry = HashableEntry {
            title: "Title",
            summary: "Summary",
            description: "",
            link: "https://example.com",
            content_values: &["https://example.com/img.png".to_string()],
        };
        assert_eq!(content_hash(&entry), content_hash(&entry));
    }
}
