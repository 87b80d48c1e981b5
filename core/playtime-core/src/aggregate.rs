//! Play-time totals per activity.
//!
//! Read-only: open timers contribute their time-so-far but are not closed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::ledger::{seconds_between, UserRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTotal {
    pub activity: String,
    pub seconds: f64,
}

/// Result of aggregating one user.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// The user has no completed sessions and nothing in progress.
    NoData,
    /// Totals sorted by activity name. Never empty.
    Totals(Vec<ActivityTotal>),
}

impl Report {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Report::NoData)
    }

    pub fn totals(&self) -> &[ActivityTotal] {
        match self {
            Report::NoData => &[],
            Report::Totals(totals) => totals,
        }
    }

    pub fn seconds_for(&self, activity: &str) -> Option<f64> {
        self.totals()
            .iter()
            .find(|total| total.activity == activity)
            .map(|total| total.seconds)
    }

    pub fn total_seconds(&self) -> f64 {
        self.totals().iter().map(|total| total.seconds).sum()
    }
}

pub fn aggregate(record: &UserRecord, now: DateTime<Utc>) -> Report {
    if record.is_empty() {
        return Report::NoData;
    }

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for session in record.sessions() {
        *totals.entry(session.activity()).or_insert(0.0) += session.duration_seconds();
    }

    for (activity, started_at) in record.open_timers().iter() {
        *totals.entry(activity.as_str()).or_insert(0.0) +=
            seconds_between(*started_at, now).max(0.0);
    }

    Report::Totals(
        totals
            .into_iter()
            .map(|(activity, seconds)| ActivityTotal {
                activity: activity.to_string(),
                seconds,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Session;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_record_is_no_data() {
        assert_eq!(aggregate(&UserRecord::default(), t0()), Report::NoData);
    }

    #[test]
    fn sums_sessions_per_activity() {
        let mut record = UserRecord::default();
        record.append_session(Session::close("Go", t0(), t0() + Duration::seconds(60)));
        record.append_session(Session::close("Chess", t0(), t0() + Duration::seconds(30)));
        record.append_session(Session::close("Go", t0(), t0() + Duration::seconds(15)));

        let report = aggregate(&record, t0() + Duration::hours(1));
        let names: Vec<_> = report.totals().iter().map(|t| t.activity.as_str()).collect();
        assert_eq!(names, vec!["Chess", "Go"]);
        assert_eq!(report.seconds_for("Go"), Some(75.0));
        assert_eq!(report.seconds_for("Chess"), Some(30.0));
        assert_eq!(report.total_seconds(), 105.0);
    }

    #[test]
    fn open_timer_adds_time_so_far_without_closing() {
        let mut record = UserRecord::default();
        record.append_session(Session::close("Go", t0(), t0() + Duration::seconds(60)));
        record.open_timers_mut().open("Go", t0() + Duration::seconds(100));
        record.open_timers_mut().open("Chess", t0() + Duration::seconds(100));

        let report = aggregate(&record, t0() + Duration::seconds(130));
        assert_eq!(report.seconds_for("Go"), Some(90.0));
        assert_eq!(report.seconds_for("Chess"), Some(30.0));
        assert_eq!(record.sessions().len(), 1);
        assert_eq!(record.open_timers().len(), 2);
    }

    #[test]
    fn open_timer_alone_is_reported() {
        let mut record = UserRecord::default();
        record.open_timers_mut().open("Chess", t0());
        let report = aggregate(&record, t0() + Duration::milliseconds(1));
        assert!(!report.is_no_data());
        assert!(report.seconds_for("Chess").unwrap() > 0.0);
    }

    #[test]
    fn open_timer_counts_sub_microsecond_time() {
        let mut record = UserRecord::default();
        record.open_timers_mut().open("Chess", t0());
        let report = aggregate(&record, t0() + Duration::nanoseconds(500));
        assert_eq!(report.seconds_for("Chess"), Some(0.0000005));
    }

    #[test]
    fn timer_started_in_future_counts_as_zero() {
        let mut record = UserRecord::default();
        record.open_timers_mut().open("Chess", t0() + Duration::seconds(10));
        let report = aggregate(&record, t0());
        assert_eq!(report.seconds_for("Chess"), Some(0.0));
    }
}
