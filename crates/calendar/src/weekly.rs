//! Weekly summary message rendering and reconciliation (§4.5.2, invariant I3).

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use syncd_adapter::OutboundMessage;
use syncd_core::models::CalendarEventLink;
use syncd_core::types::GuildId;

use crate::parse::CalendarEvent;

/// The weekly set: events with `start` in `[week_start, week_end]`, sorted.
#[must_use]
pub fn weekly_set(mut events: Vec<CalendarEvent>, week_start: DateTime<Utc>, week_end: DateTime<Utc>) -> Vec<CalendarEvent> {
    events.retain(|e| e.start >= week_start && e.start <= week_end);
    events.sort_by_key(|e| e.start);
    events
}

/// Build the content for the weekly summary message: grouped by day, each line
/// the guild-local start time and title, hyperlinked to the platform scheduled
/// event when one exists for that title.
#[must_use]
pub fn render_summary(
    guild_id: GuildId,
    events: &[CalendarEvent],
    links: &[CalendarEventLink],
    guild_tz: &Tz,
) -> OutboundMessage {
    if events.is_empty() {
        return OutboundMessage {
            content: Some("No events scheduled this week.".to_string()),
            embeds: Vec::new(),
            attachments: Vec::new(),
        };
    }

    let mut by_day: BTreeMap<chrono::NaiveDate, Vec<&CalendarEvent>> = BTreeMap::new();
    for event in events {
        let local = event.start.with_timezone(guild_tz);
        by_day.entry(local.date_naive()).or_default().push(event);
    }

    let mut lines = vec!["**This week's events**".to_string(), String::new()];
    for (day, day_events) in by_day {
        lines.push(format!("__{}__", day.format("%A, %B %-d")));
        for event in day_events {
            let local_time = event.start.with_timezone(guild_tz).format("%H:%M");
            let title = match links.iter().find(|l| l.event_title == event.title) {
                Some(link) => format!("[{}](https://discord.com/events/{}/{})", event.title, guild_id, link.platform_event_id),
                None => event.title.clone(),
            };
            lines.push(format!("• `{local_time}` {title}"));
        }
        lines.push(String::new());
    }

    OutboundMessage {
        content: Some(lines.join("\n").trim_end().to_string()),
        embeds: Vec::new(),
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use syncd_core::types::{CalendarConfigId, ScheduledEventId};

    fn event(title: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent { title: title.to_string(), description: String::new(), start, end: None }
    }

    #[test]
    fn weekly_set_filters_and_sorts() {
        let week_start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let week_end = Utc.with_ymd_and_hms(2026, 3, 8, 23, 59, 59).unwrap();
        let events = vec![
            event("Later", Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()),
            event("Earlier", Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
            event("Out of range", Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()),
        ];
        let set = weekly_set(events, week_start, week_end);
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].title, "Earlier");
    }

    #[test]
    fn empty_week_renders_placeholder() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let message = render_summary(GuildId::new(1), &[], &[], &tz);
        assert_eq!(message.content.as_deref(), Some("No events scheduled this week."));
    }

    #[test]
    fn linked_event_renders_as_hyperlink() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let guild_id = GuildId::new(1);
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let events = vec![event("Standup", start)];
        let calendar_id = CalendarConfigId::new();
        let links = vec![CalendarEventLink {
            calendar_id,
            event_title: "Standup".to_string(),
            platform_event_id: ScheduledEventId::new(99),
        }];
        let message = render_summary(guild_id, &events, &links, &tz);
        let content = message.content.unwrap();
        assert!(content.contains("[Standup](https://discord.com/events/1/99)"));
    }
}
