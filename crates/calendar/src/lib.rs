//! The calendar engine (§4.5 C5): iCal sync, weekly summaries, platform scheduled
//! event reconciliation, status transitions, and reminders.

pub mod filter;
pub mod parse;
pub mod reconcile;
pub mod reminder;
pub mod status;
pub mod sync;
pub mod weekly;

pub use reminder::run_reminder_tick;
pub use status::run_event_status_tick;
pub use sync::sync_all_calendars;
