//! Bluesky profile-post expansion (§4.4 step 2, thumbnail search order's last
//! structural fallback before OpenGraph).
//!
//! Grounded in `original_source/core/thumbnails.py::get_image_urls`: resolve a
//! `bsky.app/profile/<handle-or-did>/post/<rkey>` URL to an AT-URI, fetch the post
//! thread from the public AppView, and pull the first embedded image.

use serde::Deserialize;

const APPVIEW: &str = "https://public.api.bsky.app/xrpc";

/// Extract `(handle_or_did, rkey)` from a Bluesky post URL.
fn parse_post_url(post_url: &str) -> Option<(&str, &str)> {
    let rest = post_url
        .strip_prefix("https://bsky.app/profile/")
        .or_else(|| post_url.strip_prefix("http://bsky.app/profile/"))?;
    let (handle_or_did, after_slash) = rest.split_once("/post/")?;
    let rkey = after_slash.split(['?', '#']).next().unwrap_or(after_slash);
    if handle_or_did.is_empty() || rkey.is_empty() {
        return None;
    }
    Some((handle_or_did, rkey))
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Deserialize)]
struct ThreadResponse {
    thread: Option<ThreadNode>,
}

#[derive(Deserialize)]
struct ThreadNode {
    post: Option<PostNode>,
}

#[derive(Deserialize)]
struct PostNode {
    embed: Option<EmbedNode>,
}

#[derive(Deserialize)]
struct EmbedNode {
    #[serde(rename = "$type")]
    type_: Option<String>,
    #[serde(default)]
    images: Vec<EmbedImage>,
}

#[derive(Deserialize)]
struct EmbedImage {
    fullsize: Option<String>,
    thumb: Option<String>,
}

/// The first image embedded in the linked Bluesky post, or `None` if the post has
/// no image embed, the URL doesn't resolve, or the AppView call fails. Failures here
/// are swallowed rather than propagated — a missing Bluesky thumbnail is not a feed
/// poll failure (§4.4 step 2 is a best-effort search chain).
pub async fn first_post_image(post_url: &str) -> Option<String> {
    let (handle_or_did, rkey) = parse_post_url(post_url)?;
    let client = reqwest::Client::new();

    let did = if handle_or_did.starts_with("did:") {
        handle_or_did.to_string()
    } else {
        resolve_handle_to_did(&client, handle_or_did).await?
    };

    let at_uri = format!("at://{did}/app.bsky.feed.post/{rkey}");
    let response = client
        .get(format!("{APPVIEW}/app.bsky.feed.getPostThread"))
        .query(&[("uri", at_uri.as_str()), ("depth", "0")])
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .json::<ThreadResponse>()
        .await
        .ok()?;

    let embed = response.thread?.post?.embed?;
    if embed.type_.as_deref() != Some("app.bsky.embed.images#view") {
        return None;
    }
    let image = embed.images.into_iter().next()?;
    image.fullsize.or(image.thumb)
}

async fn resolve_handle_to_did(client: &reqwest::Client, handle: &str) -> Option<String> {
    let response = client
        .get(format!("{APPVIEW}/com.atproto.identity.resolveHandle"))
        .query(&[("handle", handle)])
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .json::<ResolveHandleResponse>()
        .await
        .ok()?;
    Some(response.did)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_handle_and_rkey() {
        let (handle, rkey) = parse_post_url("https://bsky.app/profile/alice.bsky.social/post/abc123").unwrap();
        assert_eq!(handle, "alice.bsky.social");
        assert_eq!(rkey, "abc123");
    }

    #[test]
    fn parses_did_profile() {
        let (handle, rkey) = parse_post_url("https://bsky.app/profile/did:plc:abcdef/post/xyz?query=1").unwrap();
        assert_eq!(handle, "did:plc:abcdef");
        assert_eq!(rkey, "xyz");
    }

    #[test]
    fn rejects_non_bluesky_urls() {
        assert!(parse_post_url("https://example.com/profile/alice/post/abc").is_none());
    }
}
