//! Outbound HTTP fetching and retry bookkeeping (§4.2 C2, §4.3 C3).

pub mod client;
pub mod retry;

pub use client::{ConditionalState, FetchOutcome, HttpFetcher};
pub use retry::{Backoff, RetryFabric};
