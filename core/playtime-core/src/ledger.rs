//! Session ledger: per-user play history plus in-progress activity timers.
//!
//! The durable and transient halves of a user are separate types:
//!
//! - [`SessionHistory`] is the only thing that is ever serialized.
//! - [`OpenTimers`] has no serde impls at all, so it cannot end up on disk.
//! - [`UserRecord`] is the runtime view that owns both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;

/// Seconds elapsed between two instants, at nanosecond resolution.
///
/// Every duration in the crate is derived through this function, so a
/// session's `duration_seconds` always equals `end - start` exactly.
/// Spans too long for `i64` nanoseconds (about 292 years) fall back to
/// microseconds.
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let elapsed = end.signed_duration_since(start);
    if let Some(nanos) = elapsed.num_nanoseconds() {
        return nanos as f64 / 1_000_000_000.0;
    }
    match elapsed.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => elapsed.num_milliseconds() as f64 / 1_000.0,
    }
}

/// One contiguous span of time a user spent in a single activity.
///
/// Immutable once built; the only constructor closes a timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "game_name")]
    activity: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_seconds: f64,
}

impl Session {
    /// Closes a timer that started at `start` into a session ending at `end`.
    ///
    /// An `end` earlier than `start` (wall clock stepped backwards) is pinned
    /// to `start`, producing a zero-length session.
    pub fn close(activity: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let end = end.max(start);
        Session {
            activity: activity.into(),
            start_time: start,
            end_time: end,
            duration_seconds: seconds_between(start, end),
        }
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}

/// Completed sessions for one user, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    sessions: Vec<Session>,
}

impl SessionHistory {
    pub fn new(sessions: Vec<Session>) -> Self {
        SessionHistory { sessions }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn push(&mut self, session: Session) {
        self.sessions.push(session);
    }
}

/// Activity name -> start time for everything a user is currently doing.
///
/// At most one timer per activity name; names compare case-sensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenTimers {
    timers: BTreeMap<String, DateTime<Utc>>,
}

impl OpenTimers {
    /// Starts a timer unless one is already running for `activity`.
    /// Returns `true` when a new timer was inserted.
    pub fn open(&mut self, activity: &str, at: DateTime<Utc>) -> bool {
        if self.timers.contains_key(activity) {
            return false;
        }
        self.timers.insert(activity.to_string(), at);
        true
    }

    /// Removes the timer for `activity`, returning its start time.
    pub fn close(&mut self, activity: &str) -> Option<DateTime<Utc>> {
        self.timers.remove(activity)
    }

    pub fn started_at(&self, activity: &str) -> Option<DateTime<Utc>> {
        self.timers.get(activity).copied()
    }

    pub fn contains(&self, activity: &str) -> bool {
        self.timers.contains_key(activity)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, DateTime<Utc>> {
        self.timers.iter()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Runtime state for one user: durable history plus open timers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRecord {
    history: SessionHistory,
    open: OpenTimers,
}

impl UserRecord {
    /// Rebuilds a user from persisted history. Timers always start empty:
    /// whatever was in progress before a restart has to be observed again.
    pub fn from_history(history: SessionHistory) -> Self {
        UserRecord {
            history,
            open: OpenTimers::default(),
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn sessions(&self) -> &[Session] {
        self.history.sessions()
    }

    pub fn open_timers(&self) -> &OpenTimers {
        &self.open
    }

    pub fn open_timers_mut(&mut self) -> &mut OpenTimers {
        &mut self.open
    }

    pub fn append_session(&mut self, session: Session) {
        self.history.push(session);
    }

    /// No completed sessions and nothing in progress.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.open.is_empty()
    }
}

/// Every known user, keyed by platform user id.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    users: HashMap<String, UserRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Hydrates a ledger from persisted histories (no open timers).
    pub fn from_histories(histories: HashMap<String, SessionHistory>) -> Self {
        let users = histories
            .into_iter()
            .map(|(user_id, history)| (user_id, UserRecord::from_history(history)))
            .collect();
        Ledger { users }
    }

    pub fn get_or_create_user(&mut self, user_id: &str) -> &mut UserRecord {
        self.users.entry(user_id.to_string()).or_default()
    }

    pub fn user(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn append_session(&mut self, user_id: &str, session: Session) {
        self.get_or_create_user(user_id).append_session(session);
    }

    /// Replaces the user's record with an empty one, discarding both
    /// sessions and open timers. Returns the record that was replaced.
    pub fn clear_user(&mut self, user_id: &str) -> Option<UserRecord> {
        self.users
            .insert(user_id.to_string(), UserRecord::default())
    }

    /// Durable view used by the persistence layer, sorted by user id.
    pub fn histories(&self) -> BTreeMap<&str, &SessionHistory> {
        self.users
            .iter()
            .map(|(user_id, record)| (user_id.as_str(), record.history()))
            .collect()
    }

    pub fn users(&self) -> impl Iterator<Item = (&str, &UserRecord)> {
        self.users
            .iter()
            .map(|(user_id, record)| (user_id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn open_timer_count(&self) -> usize {
        self.users.values().map(|record| record.open.len()).sum()
    }

    pub fn session_count(&self) -> usize {
        self.users.values().map(|record| record.history.len()).sum()
    }
}
