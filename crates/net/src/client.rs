//! Pooled HTTP client and conditional-GET fetching (§4.2 C2).
//!
//! Grounded in the pack's own `reqwest::ClientBuilder` usage
//! (`cloudbridgeuy-calendsync/crates/auth/src/providers/google.rs`): build one
//! client and share it, rather than constructing a `reqwest::Client` per call.

use std::time::Duration;

use reqwest::header::{HeaderMap, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use syncd_core::SyncError;

/// Previous conditional-request state for a URL, read from `FeedHttpCache`.
#[derive(Debug, Clone, Default)]
pub struct ConditionalState {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// SHA-256 of the last fetched body, used to detect `Unchanged` (§4.2) when
    /// the server doesn't honor conditional headers but the body is identical.
    pub content_hash: Option<String>,
}

/// Outcome of one conditional fetch (§4.2). `NotModified` and `Unchanged` are not
/// errors — both are successful short-circuits, just granted by different means (a
/// 304 versus a same-hash 200).
#[derive(Debug)]
pub enum FetchOutcome {
    /// Server returned 304 for our conditional request; no body was transferred.
    NotModified,
    /// Server returned 200, but the body's content hash matches the stored one —
    /// the source didn't honor our conditional headers, but nothing changed. The
    /// body is still handed back so callers can run the bounded recent-updates
    /// pass (§4.4 step 4) without a second fetch.
    Unchanged { body: String, content_hash: String },
    /// Server returned a fresh body, along with the new caching headers and content
    /// hash to persist.
    Fetched {
        body: String,
        etag: Option<String>,
        last_modified: Option<String>,
        content_hash: String,
    },
}

/// A pooled HTTP client for outbound feed/calendar fetches.
///
/// One instance is shared process-wide; `reqwest::Client` is already an `Arc`
/// internally; cloning is cheap and keeps the connection pool warm across
/// polls of different feeds on the same host (§4.2: keep-alive 30s, DNS cache
/// 5 min, per-host connection cap).
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the shared client with the pooling limits from §4.2.
    pub fn new(
        max_connections: usize,
        max_connections_per_host: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_connections_per_host)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let _ = max_connections; // reqwest has no global cap knob; bounded by per-host * host count in practice.
        Ok(Self { client })
    }

    /// Fetch `url`, sending `If-None-Match`/`If-Modified-Since` when a prior
    /// conditional state is known. A 304 maps to [`FetchOutcome::NotModified`]; any
    /// other 2xx maps to [`FetchOutcome::Fetched`]; everything else is classified
    /// into [`SyncError`] per §7 (5xx/429/timeout transient, other 4xx permanent).
    pub async fn fetch_conditional(
        &self,
        url: &str,
        prior: &ConditionalState,
    ) -> Result<FetchOutcome, SyncError> {
        let mut headers = HeaderMap::new();
        if let Some(etag) = &prior.etag {
            if let Ok(value) = etag.parse() {
                headers.insert(IF_NONE_MATCH, value);
            }
        }
        if let Some(last_modified) = &prior.last_modified {
            if let Ok(value) = last_modified.parse() {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(classify_transport_error)?;
        let content_hash = sha256_hex(&body);

        if prior.content_hash.as_deref() == Some(content_hash.as_str()) {
            return Ok(FetchOutcome::Unchanged { body, content_hash });
        }

        Ok(FetchOutcome::Fetched {
            body,
            etag,
            last_modified,
            content_hash,
        })
    }

    /// Plain GET returning a deserialized JSON body, for callers that have no use
    /// for conditional caching (e.g. the map engine's one-shot geocoding lookups).
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SyncError> {
        let response = self.client.get(url).send().await.map_err(classify_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::PermanentSource(format!("invalid json response: {e}")))
    }
}

fn sha256_hex(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

fn classify_transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() || err.is_connect() {
        SyncError::Transient(err.to_string())
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else {
        SyncError::Transient(err.to_string())
    }
}

/// 5xx and 429 are transient (the source may recover); any other 4xx is a
/// permanent source failure that counts toward the feed's failure threshold.
fn classify_status(status: StatusCode) -> SyncError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SyncError::Transient(format!("http {status}"))
    } else {
        SyncError::PermanentSource(format!("http {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
    }

    #[test]
    fn client_errors_are_permanent() {
        let err = classify_status(StatusCode::NOT_FOUND);
        assert!(!err.is_retryable());
        assert!(err.counts_toward_failure_threshold());
    }
}
