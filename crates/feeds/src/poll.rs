//! The feed poll driver (§4.4 C4): fetch, parse, diff against the posted-entry
//! ledger, render, and post/edit.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use feed_rs::model::{Entry, Feed};
use syncd_adapter::{ChatAdapter, OutboundMessage};
use syncd_core::models::{EmbedValue, FeedConfig};
use syncd_core::types::GuildId;
use syncd_core::SyncError;
use syncd_net::{ConditionalState, FetchOutcome, HttpFetcher, RetryFabric};
use syncd_store::Store;

use crate::hash::{content_hash, HashableEntry};
use crate::thumbnail::{find_structural_thumbnail, is_bluesky_feed_url, is_bluesky_post_link};
use crate::{bluesky, template};

/// How many of the newest already-posted entries the "recent-updates pass"
/// re-examines on an unchanged poll (§4.4 step 4 / SPEC_FULL §9 resolution).
const RECENT_UPDATES_SCAN_LIMIT: i64 = 5;
const RECENT_UPDATES_WINDOW_HOURS: i64 = 24;

/// Poll every enabled feed once. Per-feed failures never affect other feeds
/// (§4.4.2); each feed's outcome is logged and folded into its own failure
/// counter independently.
pub async fn poll_all_feeds<A: ChatAdapter>(
    store: &Store,
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    adapter: &A,
    max_post_age: Duration,
    failure_threshold: i32,
    guild_tz: impl Fn(GuildId) -> Tz,
) {
    let feeds = match store.feeds.list_enabled().await {
        Ok(feeds) => feeds,
        Err(err) => {
            tracing::error!(error = %err, "failed to list enabled feeds");
            return;
        }
    };

    for feed in feeds {
        let tz = guild_tz(feed.guild_id);
        if let Err(err) = poll_one_feed(store, fetcher, retry, adapter, &feed, max_post_age, &tz).await {
            tracing::warn!(feed_id = %feed.id, error = %err, "feed poll failed");
            handle_feed_failure(store, &feed, &err, failure_threshold).await;
        } else if let Err(err) = store.feeds.reset_failure(feed.id, Utc::now()).await {
            tracing::warn!(feed_id = %feed.id, error = %err, "failed to reset feed failure counter");
        }
    }
}

async fn handle_feed_failure(store: &Store, feed: &FeedConfig, err: &SyncError, failure_threshold: i32) {
    if !err.counts_toward_failure_threshold() {
        return;
    }
    match store.feeds.increment_failure(feed.id).await {
        Ok(count) if count >= failure_threshold => {
            if let Err(disable_err) = store.feeds.set_enabled(feed.id, false).await {
                tracing::error!(feed_id = %feed.id, error = %disable_err, "failed to auto-disable feed");
            } else {
                tracing::warn!(feed_id = %feed.id, count, "feed auto-disabled after repeated failures");
            }
        }
        Ok(_) => {}
        Err(inc_err) => tracing::warn!(feed_id = %feed.id, error = %inc_err, "failed to increment feed failure count"),
    }
}

async fn poll_one_feed<A: ChatAdapter>(
    store: &Store,
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    adapter: &A,
    feed: &FeedConfig,
    max_post_age: Duration,
    guild_tz: &Tz,
) -> Result<(), SyncError> {
    let op_id = format!("poll_feed:{}", feed.id);
    let prior_cache = store.feeds.get_http_cache(&feed.source_url).await?;
    let conditional = ConditionalState {
        etag: prior_cache.as_ref().and_then(|c| c.etag.clone()),
        last_modified: prior_cache.as_ref().and_then(|c| c.last_modified.clone()),
        content_hash: prior_cache.as_ref().and_then(|c| c.content_hash.clone()),
    };

    let outcome = fetch_with_retry(fetcher, retry, &op_id, &feed.source_url, &conditional).await?;

    // `NotModified` (304) carries no body: there is nothing new to diff, so the
    // recent-updates pass (§4.4 step 4) is a structural no-op in that branch —
    // it only has something to compare once a body has actually been fetched,
    // whether or not that body's own hash turned out to be new (SPEC_FULL §9).
    let parsed = match outcome {
        FetchOutcome::NotModified => return Ok(()),
        FetchOutcome::Unchanged { body, .. } => {
            store
                .feeds
                .set_http_cache(
                    &feed.source_url,
                    prior_cache.as_ref().and_then(|c| c.etag.as_deref()),
                    prior_cache.as_ref().and_then(|c| c.last_modified.as_deref()),
                    prior_cache.as_ref().and_then(|c| c.content_hash.as_deref()),
                    Utc::now(),
                )
                .await?;
            parse_feed(&body)?
        }
        FetchOutcome::Fetched { body, etag, last_modified, content_hash } => {
            let feed_doc = parse_feed(&body)?;
            store
                .feeds
                .set_http_cache(&feed.source_url, etag.as_deref(), last_modified.as_deref(), Some(&content_hash), Utc::now())
                .await?;
            feed_doc
        }
    };

    process_entries(store, adapter, feed, parsed.entries.iter().take(max_items(feed)), max_post_age, guild_tz).await?;

    // Runs on every poll that produced a body, including an `Unchanged` 200 —
    // global-hash equality can mask a local edit if the upstream feed rotates
    // entries (§4.4 step 4). Bounded to the 5 newest entries under 24h old, so it
    // never grows unboundedly with feed size. Edit-only: an entry with no posted
    // record yet is left for the next poll's step-3 pass rather than posted here,
    // so this pass never exceeds the feed's configured `max_items` bound.
    let recent_candidates = select_recent_candidates(&parsed);
    edit_changed_entries(store, adapter, feed, recent_candidates.into_iter(), guild_tz).await
}

fn parse_feed(body: &str) -> Result<Feed, SyncError> {
    feed_rs::parser::parse(body.as_bytes()).map_err(|e| SyncError::PermanentSource(format!("feed parse error: {e}")))
}

fn max_items(feed: &FeedConfig) -> usize {
    usize::try_from(feed.max_items.max(0)).unwrap_or(0)
}

/// The newest [`RECENT_UPDATES_SCAN_LIMIT`] entries published within
/// [`RECENT_UPDATES_WINDOW_HOURS`] (§4.4 step 4 / SPEC_FULL §9 resolution).
fn select_recent_candidates(parsed: &Feed) -> Vec<&Entry> {
    let cutoff = Utc::now() - Duration::hours(RECENT_UPDATES_WINDOW_HOURS);
    parsed
        .entries
        .iter()
        .filter(|e| entry_published(e).is_none_or(|p| p >= cutoff))
        .take(usize::try_from(RECENT_UPDATES_SCAN_LIMIT).unwrap_or(5))
        .collect()
}

async fn fetch_with_retry(
    fetcher: &HttpFetcher,
    retry: &RetryFabric,
    op_id: &str,
    url: &str,
    conditional: &ConditionalState,
) -> Result<FetchOutcome, SyncError> {
    loop {
        match fetcher.fetch_conditional(url, conditional).await {
            Ok(outcome) => {
                retry.note_success(op_id, Utc::now());
                return Ok(outcome);
            }
            Err(err) => {
                retry.note_failure(op_id, &err, Utc::now());
                if !retry.should_retry(op_id, &err) {
                    return Err(err);
                }
                tokio::time::sleep(retry.next_delay(op_id)).await;
            }
        }
    }
}

async fn process_entries<'a, A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    feed: &FeedConfig,
    entries: impl Iterator<Item = &'a Entry>,
    max_post_age: Duration,
    guild_tz: &Tz,
) -> Result<(), SyncError> {
    for entry in entries {
        let Some(guid) = entry_guid(entry) else { continue };
        let fields = entry_fields(entry);
        let hash = entry_hash(entry);

        let posted = store.feeds.is_posted(feed.guild_id, &guid).await?;

        match posted {
            None => {
                let published = entry_published(entry).unwrap_or_else(Utc::now);
                if Utc::now() - published > max_post_age {
                    continue;
                }
                post_new_entry(store, adapter, feed, entry, &guid, &fields, &hash, published, guild_tz).await?;
            }
            Some(record) if record.content_hash != hash => {
                edit_existing_entry(store, adapter, feed, entry, &guid, &fields, &hash, guild_tz, &record).await?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// The recent-updates pass (§4.4 step 4): only acts on entries that were already
/// posted and whose content hash changed. An entry with no posted record is
/// skipped rather than posted, so this pass never posts beyond the feed's
/// `max_items` bound enforced by [`process_entries`]'s step-3 pass.
async fn edit_changed_entries<'a, A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    feed: &FeedConfig,
    entries: impl Iterator<Item = &'a Entry>,
    guild_tz: &Tz,
) -> Result<(), SyncError> {
    for entry in entries {
        let Some(guid) = entry_guid(entry) else { continue };
        let fields = entry_fields(entry);
        let hash = entry_hash(entry);

        let Some(record) = store.feeds.is_posted(feed.guild_id, &guid).await? else { continue };
        if record.content_hash == hash {
            continue;
        }
        edit_existing_entry(store, adapter, feed, entry, &guid, &fields, &hash, guild_tz, &record).await?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn post_new_entry<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    feed: &FeedConfig,
    entry: &Entry,
    guid: &str,
    fields: &BTreeMap<String, String>,
    hash: &str,
    published: DateTime<Utc>,
    guild_tz: &Tz,
) -> Result<(), SyncError> {
    let message = render_message(feed, entry, fields, published, guild_tz).await;
    let message_id = adapter.send_message(feed.channel_id, message).await?;
    store
        .feeds
        .mark_posted(feed.guild_id, guid, Some(message_id), Some(feed.channel_id), hash, Utc::now())
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn edit_existing_entry<A: ChatAdapter>(
    store: &Store,
    adapter: &A,
    feed: &FeedConfig,
    entry: &Entry,
    guid: &str,
    fields: &BTreeMap<String, String>,
    hash: &str,
    guild_tz: &Tz,
    record: &syncd_core::models::PostedEntry,
) -> Result<(), SyncError> {
    let (Some(message_id), Some(channel_id)) = (record.message_id, record.channel_id) else {
        return Ok(());
    };
    let published = entry_published(entry).unwrap_or(record.posted_at);
    let message = render_message(feed, entry, fields, published, guild_tz).await;

    // At-least-once edit semantics (§4.4.2): a failed edit still updates the
    // stored hash, so a later real change re-triggers the edit next poll.
    if let Err(err) = adapter.edit_message(channel_id, message_id, message).await {
        tracing::warn!(feed_id = %feed.id, guid, error = %err, "failed to edit updated feed entry");
    }
    store
        .feeds
        .mark_posted(feed.guild_id, guid, Some(message_id), Some(channel_id), hash, record.posted_at)
        .await?;
    Ok(())
}

fn entry_guid(entry: &Entry) -> Option<String> {
    if !entry.id.is_empty() {
        return Some(entry.id.clone());
    }
    entry.links.first().map(|l| l.href.clone())
}

fn entry_published(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.published.or(entry.updated)
}

fn entry_link(entry: &Entry) -> String {
    entry.links.first().map(|l| l.href.clone()).unwrap_or_default()
}

fn entry_content_values(entry: &Entry) -> Vec<String> {
    let mut values = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                values.push(url.to_string());
            }
        }
    }
    values
}

fn entry_hash(entry: &Entry) -> String {
    let title = entry.title.as_ref().map(|t| t.content.as_str()).unwrap_or_default();
    let summary = entry.summary.as_ref().map(|t| t.content.as_str()).unwrap_or_default();
    let description = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .unwrap_or_default();
    let link = entry_link(entry);
    let content_values = entry_content_values(entry);

    content_hash(&HashableEntry {
        title,
        summary,
        description,
        link: &link,
        content_values: &content_values,
    })
}

fn entry_fields(entry: &Entry) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    if let Some(title) = &entry.title {
        fields.insert("title".to_string(), title.content.clone());
    }
    if let Some(summary) = &entry.summary {
        fields.insert("summary".to_string(), summary.content.clone());
    }
    if let Some(content) = &entry.content {
        if let Some(body) = &content.body {
            fields.insert("description".to_string(), body.clone());
        }
    }
    if let Some(author) = entry.authors.first() {
        fields.insert("author".to_string(), author.name.clone());
    }
    fields
}

async fn resolve_thumbnail(entry: &Entry) -> Option<String> {
    if let Some(thumb) = find_structural_thumbnail(entry) {
        return Some(thumb);
    }
    let link = entry_link(entry);
    if is_bluesky_post_link(&link) {
        if let Some(thumb) = bluesky::first_post_image(&link).await {
            return Some(thumb);
        }
    }
    None
}

async fn render_message(
    feed: &FeedConfig,
    entry: &Entry,
    entry_fields: &BTreeMap<String, String>,
    published: DateTime<Utc>,
    guild_tz: &Tz,
) -> OutboundMessage {
    let link = entry_link(entry);
    let thumbnail = resolve_thumbnail(entry).await;
    let fields = template::build_fields(entry_fields, &link, thumbnail.as_deref(), published, guild_tz);

    // A Bluesky profile feed renders through its own fixed template instead of
    // the feed's configured one (§4.4.1).
    let template = if is_bluesky_feed_url(&feed.source_url) {
        template::bluesky_embed_template(feed.accent_color, &feed.name)
    } else {
        feed.embed_template.clone()
    };
    let mut rendered = template::render(&template, &fields);
    fill_description_fallback(&mut rendered, entry_fields);
    fill_image_fallback(&mut rendered, thumbnail.as_deref());
    let rendered = template::clean(rendered);

    OutboundMessage {
        content: None,
        embeds: vec![serde_json::to_value(&rendered).unwrap_or(serde_json::Value::Null)],
        attachments: Vec::new(),
    }
}

/// If the template left `description` empty, fall back to the raw summary
/// (§4.4.1's description-fallback step).
fn fill_description_fallback(rendered: &mut EmbedValue, entry_fields: &BTreeMap<String, String>) {
    let EmbedValue::Map(map) = rendered else { return };
    let is_empty = matches!(map.get("description"), None | Some(EmbedValue::String(s)) if s.is_empty());
    if is_empty {
        if let Some(summary) = entry_fields.get("summary") {
            map.insert("description".to_string(), EmbedValue::String(strip_html(summary)));
        }
    }
}

fn fill_image_fallback(rendered: &mut EmbedValue, thumbnail: Option<&str>) {
    let EmbedValue::Map(map) = rendered else { return };
    let Some(thumb) = thumbnail else { return };
    let has_image = map
        .get("image")
        .map(|v| !matches!(v, EmbedValue::Null))
        .unwrap_or(false);
    if !has_image {
        let mut image = BTreeMap::new();
        image.insert("url".to_string(), EmbedValue::String(thumb.to_string()));
        map.insert("image".to_string(), EmbedValue::Map(image));
    }
}

fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
