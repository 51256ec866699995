#![forbid(unsafe_code)]

//! Core domain model and business logic for the Jejum fasting tracker.
//!
//! This crate provides:
//! - Domain types (plans, session, history, profile records)
//! - Plan catalog
//! - Session state machine with pause/resume and archiving
//! - Statistics (completion rate, streak, tier)
//! - Persistence (key-value store with file locking)
//! - Auto-completion poller

pub mod types;
pub mod error;
pub mod clock;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod history;
pub mod session;
pub mod stats;
pub mod profile;
pub mod poller;
pub mod timefmt;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use catalog::{build_default_catalog, get_default_catalog, PlanCatalog};
pub use config::Config;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use history::HistoryLedger;
pub use session::{FastingTracker, Ignored, Transition};
pub use stats::FastingStats;
pub use profile::ProfileBook;
pub use poller::{CancelHandle, PollExit, Poller, TickOutcome};
