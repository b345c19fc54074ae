//! syncd-core — domain logic and models shared by every engine crate.
//!
//! This crate contains pure domain logic with no I/O. All database models,
//! identifier types, and error types live here.

pub mod config;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod timezone;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use models::RgbColor;
pub use recurrence::{expand_rrule, next_occurrences, validate_rrule};
pub use timezone::{default_timezone, parse_timezone, to_timezone, to_utc, validate_timezone, week_end, week_start_monday};
