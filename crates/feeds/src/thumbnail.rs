//! Thumbnail search chain (§4.4 step 2).
//!
//! Grounded in `original_source/core/thumbnails.py::find_thumbnail`, reordered
//! to match SPEC_FULL §4.4's stated precedence (OpenGraph moved from first to
//! last priority, since it costs an extra HTTP fetch per entry and every
//! structural source already carries a thumbnail most of the time).

use feed_rs::model::Entry;

/// Search order: media-thumbnail -> media-content -> enclosures (image/*) ->
/// `<link rel=image>` -> first `<img>` in content -> first `<img>` in summary.
/// Bluesky-post expansion and OpenGraph fallback are handled by the caller,
/// since both require an outbound HTTP fetch through C2 rather than pure
/// parsing of the already-fetched entry.
#[must_use]
pub fn find_structural_thumbnail(entry: &Entry) -> Option<String> {
    for media in &entry.media {
        if let Some(thumb) = media.thumbnails.first() {
            return Some(thumb.image.uri.clone());
        }
    }

    for media in &entry.media {
        if let Some(content) = media.content.first() {
            if let Some(uri) = &content.url {
                return Some(uri.to_string());
            }
        }
    }

    for link in &entry.links {
        let is_image_rel = link.rel.as_deref() == Some("enclosure")
            && link.media_type.as_deref().is_some_and(|t| t.starts_with("image/"));
        if is_image_rel {
            return Some(link.href.clone());
        }
    }

    for link in &entry.links {
        if link.media_type.as_deref().is_some_and(|t| t.starts_with("image/")) {
            return Some(link.href.clone());
        }
    }

    if let Some(content) = &entry.content {
        if let Some(body) = &content.body {
            if let Some(url) = first_img_src(body) {
                return Some(url);
            }
        }
    }

    if let Some(summary) = &entry.summary {
        if let Some(url) = first_img_src(&summary.content) {
            return Some(url);
        }
    }

    None
}

/// Find the `src` attribute of the first `<img>` tag, without a full HTML
/// parse. Deliberately hand-rolled rather than pulling in a regex/HTML crate
/// for a single-attribute scan of already-trusted feed content.
fn first_img_src(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let tag_start = lower.find("<img")?;
    let tag_end = lower[tag_start..].find('>').map(|i| tag_start + i)?;
    let tag = &html[tag_start..tag_end];
    let lower_tag = &lower[tag_start..tag_end];

    let src_pos = lower_tag.find("src=")?;
    let after_attr = src_pos + "src=".len();
    let quote = tag.as_bytes().get(after_attr).copied()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value_start = after_attr + 1;
    let value_end = tag[value_start..].find(quote as char).map(|i| value_start + i)?;
    Some(tag[value_start..value_end].to_string())
}

/// The post link is eligible for Bluesky-thread expansion.
#[must_use]
pub fn is_bluesky_post_link(link: &str) -> bool {
    link.contains("bsky.app/profile/") && link.contains("/post/")
}

/// The feed's own source URL is a Bluesky profile feed (§4.4.1's specialized
/// template trigger), not merely a link that happens to point at one post.
#[must_use]
pub fn is_bluesky_feed_url(source_url: &str) -> bool {
    source_url.contains("bsky.app/profile/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_img_src_in_html() {
        let html = r#"<p>hello</p><img src="https://example.com/a.png" alt="x">"#;
        assert_eq!(first_img_src(html), Some("https://example.com/a.png".to_string()));
    }

    #[test]
    fn returns_none_without_img_tag() {
        assert_eq!(first_img_src("<p>no image here</p>"), None);
    }

    #[test]
    fn recognises_bluesky_post_links() {
        assert!(is_bluesky_post_link("https://bsky.app/profile/alice.bsky.social/post/abc123"));
        assert!(!is_bluesky_post_link("https://example.com/profile/alice/post/abc123"));
    }

    #[test]
    fn recognises_bluesky_feed_urls() {
        assert!(is_bluesky_feed_url("https://bsky.app/profile/alice.bsky.social"));
        assert!(!is_bluesky_feed_url("https://example.com/feed.xml"));
    }
}
