//! iCal parsing and recurrence expansion (§4.5 C5, §6 "RFC 5545 parsing with
//! recurrence expansion over a 4-week forward window").
//!
//! Grounded in the pack's own `icalendar`-crate usage (no teacher precedent — the
//! teacher has no calendar ingestion at all): `Calendar::from_str`, iterate
//! `CalendarComponent::Event`, and the `DatePerhapsTime::{DateTime, Date}` match to
//! normalize both timed and all-day events to UTC. Recurrence expansion reuses
//! `syncd_core::recurrence::expand_rrule` (the teacher's own RRULE module)
//! rather than re-implementing RFC 5545 recurrence math here.

use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use icalendar::{Calendar, CalendarComponent, Component, DatePerhapsTime, EventLike};
use syncd_core::recurrence::expand_rrule;
use syncd_core::SyncError;

/// How far forward recurring events are expanded from `now` (§4.5 sync driver).
pub const EXPANSION_WINDOW_DAYS: i64 = 28;

/// Cap on expanded occurrences per recurring event, guarding against a
/// pathological `RRULE` (e.g. a sub-minute frequency) blowing up the weekly set.
const MAX_OCCURRENCES_PER_EVENT: usize = 500;

/// One calendar entry, after recurrence expansion: either a single non-recurring
/// event, or one occurrence of a recurring one.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Parse `ical_text` and expand every event's recurrence (if any) into individual
/// occurrences falling in `[range_start, range_end]`. Non-recurring events are
/// included as-is when their own start falls in range.
pub fn parse_and_expand(
    ical_text: &str,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, SyncError> {
    let calendar = Calendar::from_str(ical_text)
        .map_err(|e| SyncError::PermanentSource(format!("ical parse error: {e}")))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else { continue };

        let Some(start) = normalize_date(event.get_start()) else { continue };
        let end = normalize_date(event.get_end());
        let title = event.get_summary().unwrap_or("Untitled event").to_string();
        let description = event.get_description().unwrap_or_default().to_string();

        match event.property_value("RRULE") {
            Some(rrule) => {
                let occurrences =
                    expand_rrule(rrule, start, range_start, range_end, MAX_OCCURRENCES_PER_EVENT)?;
                let duration = end.map(|e| e - start);
                for occurrence_start in occurrences {
                    events.push(CalendarEvent {
                        title: title.clone(),
                        description: description.clone(),
                        start: occurrence_start,
                        end: duration.map(|d| occurrence_start + d),
                    });
                }
            }
            None => {
                if start >= range_start && start <= range_end {
                    events.push(CalendarEvent { title, description, start, end });
                }
            }
        }
    }

    events.sort_by_key(|e| e.start);
    Ok(events)
}

/// `DatePerhapsTime::DateTime` converts directly; an all-day `Date` is anchored to
/// local midnight, matching the pack's own `90af7cd8` caldav-block handling of the
/// same enum.
fn normalize_date(date: Option<DatePerhapsTime>) -> Option<DateTime<Utc>> {
    match date? {
        DatePerhapsTime::DateTime(dt) => dt.try_into_utc(),
        DatePerhapsTime::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|dt| dt.to_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:1@example.com\r\n\
SUMMARY:Standup\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T093000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    const RECURRING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:2@example.com\r\n\
SUMMARY:Weekly Sync\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T100000Z\r\n\
RRULE:FREQ=WEEKLY;COUNT=8\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn parses_single_event_in_range() {
        let range_start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let range_end = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let events = parse_and_expand(SAMPLE, range_start, range_end).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Standup");
    }

    #[test]
    fn event_outside_range_is_dropped() {
        let range_start = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let range_end = Utc.with_ymd_and_hms(2026, 4, 8, 0, 0, 0).unwrap();
        let events = parse_and_expand(SAMPLE, range_start, range_end).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn recurring_event_expands_within_window() {
        let range_start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let range_end = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let events = parse_and_expand(RECURRING, range_start, range_end).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Weekly Sync");
    }
}
