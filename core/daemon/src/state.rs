//! Request-facing state owned by the daemon.
//!
//! Wraps the single [`Tracker`] and translates protocol payloads into tracker
//! calls. Bot presence is dropped here, before anything touches the ledger.

use chrono::{DateTime, Utc};
use playtime_core::{Report, ResetOutcome, Tracker, TrackerStats};
use playtime_daemon_protocol::{ActivityTotal, CommandEvent, CommandReply, PresenceUpdate, Verb};
use serde::Serialize;

pub struct SharedState {
    tracker: Tracker,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedSession {
    pub activity: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceOutcome {
    pub accepted: bool,
    pub tracked: bool,
    pub closed: Vec<ClosedSession>,
    pub opened: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub tracker: TrackerStats,
    pub data_file: Option<String>,
}

impl SharedState {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            started_at: Utc::now(),
        }
    }

    pub fn apply_presence(&self, update: &PresenceUpdate) -> PresenceOutcome {
        self.apply_presence_at(update, Utc::now())
    }

    fn apply_presence_at(&self, update: &PresenceUpdate, now: DateTime<Utc>) -> PresenceOutcome {
        if update.bot {
            tracing::debug!(user_id = %update.user_id, "Ignoring bot presence");
            return PresenceOutcome {
                accepted: true,
                tracked: false,
                closed: Vec::new(),
                opened: Vec::new(),
            };
        }

        let observed = update.tracked_activities();
        tracing::debug!(
            user_id = %update.user_id,
            username = %update.display_name(),
            activities = observed.len(),
            "Presence snapshot"
        );
        let result = self
            .tracker
            .observe_presence_at(&update.user_id, &observed, now);

        PresenceOutcome {
            accepted: true,
            tracked: true,
            closed: result
                .closed
                .iter()
                .map(|session| ClosedSession {
                    activity: session.activity().to_string(),
                    duration_seconds: session.duration_seconds(),
                })
                .collect(),
            opened: result.opened,
        }
    }

    pub fn handle_command(&self, command: &CommandEvent) -> CommandReply {
        self.handle_command_at(command, Utc::now())
    }

    fn handle_command_at(&self, command: &CommandEvent, now: DateTime<Utc>) -> CommandReply {
        let verb = match command.verb() {
            Some(verb) => verb,
            None => return CommandReply::Ignored,
        };

        tracing::info!(
            user_id = %command.user_id,
            display_name = %command.display_name(),
            verb = ?verb,
            "Command received"
        );

        match verb {
            Verb::Report => match self.tracker.report_at(&command.user_id, now) {
                Report::NoData => CommandReply::NoData,
                Report::Totals(totals) => CommandReply::Report {
                    totals: totals
                        .into_iter()
                        .map(|total| ActivityTotal {
                            activity: total.activity,
                            seconds: total.seconds,
                        })
                        .collect(),
                },
            },
            Verb::Reset => CommandReply::Reset {
                cleared: self.tracker.reset(&command.user_id) == ResetOutcome::Cleared,
            },
        }
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            started_at: self.started_at,
            tracker: self.tracker.stats(),
            data_file: self
                .tracker
                .store()
                .map(|store| store.path().display().to_string()),
        }
    }

    pub fn shutdown(&self) {
        self.tracker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use playtime_daemon_protocol::Activity;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap()
    }

    fn presence(games: &[&str]) -> PresenceUpdate {
        PresenceUpdate {
            user_id: "1234".to_string(),
            username: Some("ana".to_string()),
            bot: false,
            activities: games.iter().map(|name| Activity::game(*name)).collect(),
        }
    }

    fn command(content: &str) -> CommandEvent {
        CommandEvent {
            user_id: "1234".to_string(),
            display_name: Some("ana".to_string()),
            content: content.to_string(),
        }
    }

    #[test]
    fn bot_presence_is_not_tracked() {
        let state = SharedState::new(Tracker::in_memory());
        let mut update = presence(&["Chess"]);
        update.bot = true;

        let outcome = state.apply_presence_at(&update, t0());
        assert!(outcome.accepted);
        assert!(!outcome.tracked);
        assert_eq!(state.health_snapshot().tracker.users, 0);
    }

    #[test]
    fn presence_reports_closed_and_opened() {
        let state = SharedState::new(Tracker::in_memory());
        let first = state.apply_presence_at(&presence(&["Chess"]), t0());
        assert_eq!(first.opened, vec!["Chess".to_string()]);

        let second = state.apply_presence_at(&presence(&["Go"]), t0() + Duration::seconds(60));
        assert_eq!(
            second.closed,
            vec![ClosedSession {
                activity: "Chess".to_string(),
                duration_seconds: 60.0,
            }]
        );
        assert_eq!(second.opened, vec!["Go".to_string()]);
    }

    #[test]
    fn report_includes_in_progress_time() {
        let state = SharedState::new(Tracker::in_memory());
        state.apply_presence_at(&presence(&["Chess"]), t0());

        let reply = state.handle_command_at(&command("!mygames"), t0() + Duration::seconds(30));
        assert_eq!(
            reply,
            CommandReply::Report {
                totals: vec![ActivityTotal {
                    activity: "Chess".to_string(),
                    seconds: 30.0,
                }],
            }
        );
    }

    #[test]
    fn reset_then_report_is_no_data() {
        let state = SharedState::new(Tracker::in_memory());
        assert_eq!(
            state.handle_command_at(&command("!cleargames"), t0()),
            CommandReply::Reset { cleared: false }
        );

        state.apply_presence_at(&presence(&["Chess"]), t0());
        assert_eq!(
            state.handle_command_at(&command("!cleargames"), t0()),
            CommandReply::Reset { cleared: true }
        );
        assert_eq!(
            state.handle_command_at(&command("!mygames"), t0()),
            CommandReply::NoData
        );
    }

    #[test]
    fn unknown_command_is_ignored() {
        let state = SharedState::new(Tracker::in_memory());
        assert_eq!(
            state.handle_command_at(&command("hello there"), t0()),
            CommandReply::Ignored
        );
        assert_eq!(state.health_snapshot().tracker.users, 0);
    }
}
