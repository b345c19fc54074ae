//! Whitelist/blacklist title filtering (§4.5.1).

use crate::parse::CalendarEvent;

/// An entry passes iff no blacklist term matches its title, and — when the
/// whitelist is non-empty — at least one whitelist term matches. Blacklist takes
/// priority: a title matching both lists is excluded.
#[must_use]
pub fn passes_filter(title: &str, whitelist: &[String], blacklist: &[String]) -> bool {
    let lower = title.to_lowercase();
    if blacklist.iter().any(|term| lower.contains(&term.to_lowercase())) {
        return false;
    }
    if whitelist.is_empty() {
        return true;
    }
    whitelist.iter().any(|term| lower.contains(&term.to_lowercase()))
}

pub fn filter_events(events: Vec<CalendarEvent>, whitelist: &[String], blacklist: &[String]) -> Vec<CalendarEvent> {
    events.into_iter().filter(|e| passes_filter(&e.title, whitelist, blacklist)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_pass_everything() {
        assert!(passes_filter("Board Game Night", &[], &[]));
    }

    #[test]
    fn blacklist_excludes_matching_title() {
        let blacklist = vec!["cancelled".to_string()];
        assert!(!passes_filter("Standup (CANCELLED)", &[], &blacklist));
    }

    #[test]
    fn whitelist_requires_a_match_when_non_empty() {
        let whitelist = vec!["standup".to_string()];
        assert!(passes_filter("Daily Standup", &whitelist, &[]));
        assert!(!passes_filter("Retro", &whitelist, &[]));
    }

    #[test]
    fn blacklist_beats_whitelist() {
        let whitelist = vec!["standup".to_string()];
        let blacklist = vec!["cancelled".to_string()];
        assert!(!passes_filter("Standup (cancelled)", &whitelist, &blacklist));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let blacklist = vec!["Holiday".to_string()];
        assert!(!passes_filter("office holiday party", &[], &blacklist));
    }
}
