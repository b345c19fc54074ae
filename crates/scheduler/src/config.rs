//! Per-task intervals (§4.5 "Three periodic drivers share the same configuration",
//! §4.7's named-task list).

use std::time::Duration;

/// One interval per named periodic task. `feed_poll` is the only one carried over
/// from [`syncd_core::config::CoreConfig`] (it is also the default the spec states
/// in §4.4); the rest are fixed by §4.5/§4.7 and not currently exposed as separate
/// environment knobs, matching the spec's own wording ("every 5 minutes", "hourly",
/// "every 15 minutes") rather than inventing new env vars for them.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerIntervals {
    /// §4.4: feed poll, default 5 minutes.
    pub feed_poll: Duration,
    /// §4.5 "Sync driver": hourly.
    pub calendar_sync: Duration,
    /// §4.5.4 "Event-status driver": every 5 minutes.
    pub event_status: Duration,
    /// §4.5.5 "Reminder driver": every 15 minutes.
    pub reminder: Duration,
    /// §4.1 moderation repo / §4.7 "monitor refresh": polls for monitor rows whose
    /// own `refresh_interval_secs` has elapsed. A 1-minute tick gives sub-minute
    /// monitor configs reasonable fidelity without a dedicated per-monitor timer.
    pub monitor_refresh: Duration,
}

impl SchedulerIntervals {
    #[must_use]
    pub fn from_feed_poll_secs(feed_poll_secs: u64) -> Self {
        Self {
            feed_poll: Duration::from_secs(feed_poll_secs),
            calendar_sync: Duration::from_secs(3600),
            event_status: Duration::from_secs(300),
            reminder: Duration::from_secs(900),
            monitor_refresh: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_poll_interval_is_configurable_the_rest_are_fixed() {
        let intervals = SchedulerIntervals::from_feed_poll_secs(120);
        assert_eq!(intervals.feed_poll, Duration::from_secs(120));
        assert_eq!(intervals.calendar_sync, Duration::from_secs(3600));
        assert_eq!(intervals.event_status, Duration::from_secs(300));
        assert_eq!(intervals.reminder, Duration::from_secs(900));
        assert_eq!(intervals.monitor_refresh, Duration::from_secs(60));
    }
}
