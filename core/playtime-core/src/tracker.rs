//! Shared tracker: the one ledger, behind one lock.
//!
//! Every read and write of the ledger, including the save that follows a
//! mutation, happens inside a single critical section. A save therefore
//! always captures a ledger that nothing else is mutating, at the cost of
//! save latency landing on whichever handler triggered it.
//!
//! Saves are triggered by:
//! - a presence update that closed at least one session
//! - a reset of a user that existed
//! - [`Tracker::shutdown`]
//!
//! A failed save is logged and otherwise ignored; the next trigger retries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, Report};
use crate::ledger::{Ledger, UserRecord};
use crate::reconcile::{reconcile, Reconciliation};
use crate::storage::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetOutcome {
    Cleared,
    NothingToClear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerStats {
    pub users: usize,
    pub sessions: usize,
    pub open_timers: usize,
    pub last_save: Option<DateTime<Utc>>,
}

struct Guarded {
    ledger: Ledger,
    last_save: Option<DateTime<Utc>>,
}

pub struct Tracker {
    inner: Mutex<Guarded>,
    store: Option<LedgerStore>,
}

impl Tracker {
    /// A tracker that never touches disk.
    pub fn in_memory() -> Self {
        Tracker::with_ledger(Ledger::new(), None)
    }

    pub fn with_ledger(ledger: Ledger, store: Option<LedgerStore>) -> Self {
        Tracker {
            inner: Mutex::new(Guarded {
                ledger,
                last_save: None,
            }),
            store,
        }
    }

    /// Hydrates from `store`. An unreadable or corrupt file is logged and
    /// replaced by an empty ledger; the next save overwrites it.
    pub fn open(store: LedgerStore) -> Self {
        let ledger = match store.load() {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %store.path().display(),
                    "Could not load game data; starting with an empty ledger"
                );
                Ledger::new()
            }
        };
        Tracker::with_ledger(ledger, Some(store))
    }

    pub fn store(&self) -> Option<&LedgerStore> {
        self.store.as_ref()
    }

    pub fn observe_presence(&self, user_id: &str, observed: &BTreeSet<String>) -> Reconciliation {
        self.observe_presence_at(user_id, observed, Utc::now())
    }

    pub fn observe_presence_at(
        &self,
        user_id: &str,
        observed: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Reconciliation {
        let mut guarded = self.lock();
        let record = guarded.ledger.get_or_create_user(user_id);
        let result = reconcile(record, observed, now);

        for session in &result.closed {
            info!(
                user_id = %user_id,
                activity = %session.activity(),
                duration_secs = session.duration_seconds(),
                "Activity stopped"
            );
        }
        for activity in &result.opened {
            info!(user_id = %user_id, activity = %activity, "Activity started");
        }

        if !result.closed.is_empty() {
            self.persist_locked(&mut guarded, "session_closed");
        }
        result
    }

    pub fn report(&self, user_id: &str) -> Report {
        self.report_at(user_id, Utc::now())
    }

    pub fn report_at(&self, user_id: &str, now: DateTime<Utc>) -> Report {
        let mut guarded = self.lock();
        let report = aggregate(guarded.ledger.get_or_create_user(user_id), now);
        debug!(
            user_id = %user_id,
            activities = report.totals().len(),
            "Report computed"
        );
        report
    }

    pub fn reset(&self, user_id: &str) -> ResetOutcome {
        let mut guarded = self.lock();
        match guarded.ledger.clear_user(user_id) {
            Some(previous) => {
                info!(
                    user_id = %user_id,
                    sessions = previous.sessions().len(),
                    open_timers = previous.open_timers().len(),
                    "User data cleared"
                );
                self.persist_locked(&mut guarded, "reset");
                ResetOutcome::Cleared
            }
            None => {
                debug!(user_id = %user_id, "Reset requested for unknown user");
                ResetOutcome::NothingToClear
            }
        }
    }

    /// Final save before the process lets go of its event source.
    pub fn shutdown(&self) {
        let mut guarded = self.lock();
        self.persist_locked(&mut guarded, "shutdown");
    }

    pub fn user_snapshot(&self, user_id: &str) -> Option<UserRecord> {
        self.lock().ledger.user(user_id).cloned()
    }

    pub fn stats(&self) -> TrackerStats {
        let guarded = self.lock();
        TrackerStats {
            users: guarded.ledger.len(),
            sessions: guarded.ledger.session_count(),
            open_timers: guarded.ledger.open_timer_count(),
            last_save: guarded.last_save,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Guarded> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist_locked(&self, guarded: &mut Guarded, reason: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.save(&guarded.ledger) {
            Ok(()) => {
                guarded.last_save = Some(Utc::now());
                info!(reason, "Game data saved");
            }
            Err(err) => {
                warn!(
                    error = %err,
                    reason,
                    "Failed to save game data; keeping in-memory ledger"
                );
            }
        }
    }
}
