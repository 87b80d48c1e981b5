//! # playtime-core
//!
//! Session tracking for chat-platform presence: how long each user spends in
//! each game, built from a stream of presence snapshots.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. All operations are bounded
//!   in-memory transformations plus at most one file write.
//! - **Explicit context**: There is no global ledger. The event-handling layer
//!   constructs a [`Tracker`] and passes it (usually in an `Arc`) to handlers.
//! - **Durable vs transient**: Only completed sessions are persisted; open
//!   timers live in memory and are rebuilt from future presence snapshots.
//! - **Graceful degradation**: A missing or corrupt ledger file yields an
//!   empty ledger; a failed save leaves memory authoritative.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use playtime_core::{LedgerStore, Tracker};
//!
//! let tracker = Tracker::open(LedgerStore::new("game_data.json"));
//! tracker.observe_presence("1234", &["Chess".to_string()].into());
//! let report = tracker.report("1234");
//! tracker.shutdown();
//! ```

pub mod aggregate;
pub mod error;
pub mod format;
pub mod ledger;
pub mod reconcile;
pub mod storage;
pub mod tracker;

pub use aggregate::{aggregate, ActivityTotal, Report};
pub use error::{Result, StorageError};
pub use format::{format_duration, render_no_data, render_report, render_reset};
pub use ledger::{seconds_between, Ledger, OpenTimers, Session, SessionHistory, UserRecord};
pub use reconcile::{reconcile, Reconciliation};
pub use storage::LedgerStore;
pub use tracker::{ResetOutcome, Tracker, TrackerStats};
