//! Presence reconciliation.
//!
//! Turns a presence snapshot (the full set of tracked activities a user is
//! doing right now) into timer changes on that user's record:
//!
//! ```text
//! timer open, activity absent   -> close timer, append Session{start, now}
//! no timer,   activity present  -> open timer at now
//! timer open, activity present  -> untouched
//! ```
//!
//! All closures are applied before any openings.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::ledger::{Session, UserRecord};

/// What a single snapshot changed for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Sessions appended to the user's history, in append order.
    pub closed: Vec<Session>,
    /// Activities that got a fresh timer.
    pub opened: Vec<String>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.closed.is_empty() && self.opened.is_empty()
    }
}

/// Applies `observed` to `record` at reference time `now`.
pub fn reconcile(
    record: &mut UserRecord,
    observed: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    let stopped: Vec<String> = record
        .open_timers()
        .iter()
        .filter(|(activity, _)| !observed.contains(activity.as_str()))
        .map(|(activity, _)| activity.clone())
        .collect();

    for activity in stopped {
        if let Some(start) = record.open_timers_mut().close(&activity) {
            let session = Session::close(activity, start, now);
            record.append_session(session.clone());
            result.closed.push(session);
        }
    }

    for activity in observed {
        if record.open_timers_mut().open(activity, now) {
            result.opened.push(activity.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn new_activity_opens_timer() {
        let mut record = UserRecord::default();
        let result = reconcile(&mut record, &snapshot(&["Chess"]), t0());
        assert_eq!(result.opened, vec!["Chess".to_string()]);
        assert!(result.closed.is_empty());
        assert_eq!(record.open_timers().started_at("Chess"), Some(t0()));
    }

    #[test]
    fn missing_activity_closes_timer_into_session() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess"]), t0());
        let result = reconcile(&mut record, &snapshot(&[]), t0() + Duration::seconds(90));

        assert_eq!(result.closed.len(), 1);
        let session = &record.sessions()[0];
        assert_eq!(session.activity(), "Chess");
        assert_eq!(session.start_time(), t0());
        assert_eq!(session.end_time(), t0() + Duration::seconds(90));
        assert_eq!(session.duration_seconds(), 90.0);
        assert!(record.open_timers().is_empty());
    }

    #[test]
    fn identical_snapshot_is_noop() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess", "Go"]), t0());
        let before = record.clone();

        let result = reconcile(
            &mut record,
            &snapshot(&["Chess", "Go"]),
            t0() + Duration::seconds(30),
        );
        assert!(result.is_noop());
        assert_eq!(record, before);
    }

    #[test]
    fn empty_snapshot_closes_everything() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess", "Go", "Poker"]), t0());
        let result = reconcile(&mut record, &snapshot(&[]), t0() + Duration::seconds(5));
        assert_eq!(result.closed.len(), 3);
        assert!(result.opened.is_empty());
        assert!(record.open_timers().is_empty());
    }

    #[test]
    fn swap_closes_before_opening() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess"]), t0());
        let at = t0() + Duration::seconds(60);
        let result = reconcile(&mut record, &snapshot(&["Go"]), at);

        assert_eq!(result.closed.len(), 1);
        assert_eq!(result.closed[0].activity(), "Chess");
        assert_eq!(result.opened, vec!["Go".to_string()]);
        assert_eq!(record.open_timers().started_at("Go"), Some(at));
    }

    #[test]
    fn stop_then_restart_in_same_tick_yields_fresh_timer() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess"]), t0());
        let at = t0() + Duration::seconds(45);
        reconcile(&mut record, &snapshot(&[]), at);
        let result = reconcile(&mut record, &snapshot(&["Chess"]), at);

        assert_eq!(record.sessions().len(), 1);
        assert_eq!(result.opened, vec!["Chess".to_string()]);
        assert_eq!(record.open_timers().started_at("Chess"), Some(at));
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut record = UserRecord::default();
        reconcile(&mut record, &snapshot(&["Chess"]), t0());
        let result = reconcile(&mut record, &snapshot(&["chess"]), t0() + Duration::seconds(1));
        assert_eq!(result.closed.len(), 1);
        assert_eq!(result.opened, vec!["chess".to_string()]);
    }
}
