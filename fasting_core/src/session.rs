//! Fasting session state machine.
//!
//! [`FastingTracker`] owns the singleton [`FastingSession`], the selected
//! plan and the history ledger. Every command mutates in memory, writes the
//! affected records through to the store, and returns a [`Transition`]
//! describing what happened so the caller can re-render.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Fasting -> (Paused <-> Fasting) -> Idle
//! ```
//!
//! `Completed` is a terminal snapshot: time stops at the planned end and
//! the only legal command is `stop_fasting`.
//!
//! The tracker never schedules anything. All derived values are computed
//! from the clock when queried; see [`crate::poller`] for auto-completion.

use crate::catalog::PlanCatalog;
use crate::clock::Clock;
use crate::history::{HistoryLedger, MIN_ARCHIVED_DURATION_MS};
use crate::store::{self, keys, KeyValueStore};
use crate::types::{FastingPlan, FastingSession, HistoryEntry, SessionStatus};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Why a command had no effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ignored {
    /// `start_fasting` without a selected plan
    NoPlanSelected,
    /// `start_fasting` while a session is already running
    AlreadyActive,
    /// `pause_fasting` outside the Fasting state
    NotFasting,
    /// `resume_fasting` outside the Paused state
    NotPaused,
    /// `stop_fasting` while Idle
    NotActive,
}

/// Outcome of a state machine command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Started {
        ends_at: DateTime<Utc>,
    },
    Paused {
        at: DateTime<Utc>,
    },
    Resumed {
        paused_for: Duration,
        ends_at: DateTime<Utc>,
    },
    Stopped {
        /// Net fasting milliseconds at the moment of stopping
        duration_ms: i64,
        /// The history entry written, or None if the session was too short
        archived: Option<HistoryEntry>,
    },
    /// Precondition not met; nothing changed and nothing was written
    Ignored(Ignored),
}

impl Transition {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Transition::Ignored(_))
    }
}

/// Milliseconds from `earlier` to `later`
fn ms_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds()
}

/// State store for the fasting timer.
///
/// Single writer: commands take `&mut self`, so interleaved
/// read-modify-write sequences are ruled out in-process. Share across
/// threads only behind one mutex.
pub struct FastingTracker<S: KeyValueStore, C: Clock> {
    store: S,
    clock: C,
    catalog: PlanCatalog,
    current_plan: Option<FastingPlan>,
    session: FastingSession,
    history: HistoryLedger,
}

impl<S: KeyValueStore, C: Clock> FastingTracker<S, C> {
    /// Load tracker state from `store`.
    ///
    /// Missing or corrupt records fall back to defaults: the catalog's
    /// default plan, an Idle session and an empty history.
    pub fn open(store: S, clock: C, catalog: PlanCatalog) -> Result<Self> {
        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }
        let default_plan = catalog
            .default_plan()
            .cloned()
            .ok_or_else(|| Error::CatalogValidation("Catalog has no plans".into()))?;

        let current_plan: Option<FastingPlan> =
            store::load_or_else(&store, keys::CURRENT_PLAN, || Some(default_plan.clone()));
        if let Some(plan) = &current_plan {
            if catalog.get(&plan.id).is_none() {
                tracing::info!("Selected plan {} is no longer in the catalog", plan.id);
            }
        }

        let idle_plan = current_plan.clone().unwrap_or(default_plan);
        let mut session: FastingSession =
            store::load_or_else(&store, keys::FASTING_SESSION, || {
                FastingSession::idle(idle_plan.clone())
            });
        if !session.is_consistent() {
            tracing::warn!(
                "Stored session in state {:?} is inconsistent. Resetting to idle.",
                session.status
            );
            session = FastingSession::idle(idle_plan);
        }

        let history = HistoryLedger::load(&store);

        tracing::debug!(
            "Opened tracker: session {:?}, {} history entries",
            session.status,
            history.len()
        );

        Ok(Self {
            store,
            clock,
            catalog,
            current_plan,
            session,
            history,
        })
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Begin a fast with the selected plan
    pub fn start_fasting(&mut self) -> Result<Transition> {
        if self.session.status.is_active() {
            return Ok(Transition::Ignored(Ignored::AlreadyActive));
        }
        let Some(plan) = self.current_plan.clone() else {
            tracing::info!("Cannot start fasting: no plan selected");
            return Ok(Transition::Ignored(Ignored::NoPlanSelected));
        };

        let now = self.clock.now();
        let ends_at = now
            .checked_add_signed(plan.planned_duration())
            .ok_or_else(|| Error::Other(format!("Plan {} is too long to schedule", plan.id)))?;

        tracing::info!("Started {} fast, planned end {}", plan.id, ends_at);

        self.session = FastingSession {
            status: SessionStatus::Fasting,
            start_time: Some(now),
            end_time: Some(ends_at),
            paused_at: None,
            total_paused_time: 0,
            plan,
        };
        self.save_session()?;

        Ok(Transition::Started { ends_at })
    }

    pub fn pause_fasting(&mut self) -> Result<Transition> {
        if self.session.status != SessionStatus::Fasting {
            return Ok(Transition::Ignored(Ignored::NotFasting));
        }

        let now = self.clock.now();
        self.session.paused_at = Some(now);
        self.session.status = SessionStatus::Paused;
        self.save_session()?;

        tracing::info!("Paused fast at {}", now);
        Ok(Transition::Paused { at: now })
    }

    /// Resume a paused fast, pushing the planned end back by the pause
    pub fn resume_fasting(&mut self) -> Result<Transition> {
        if self.session.status != SessionStatus::Paused {
            return Ok(Transition::Ignored(Ignored::NotPaused));
        }
        let (Some(paused_at), Some(end_time)) = (self.session.paused_at, self.session.end_time)
        else {
            return Ok(Transition::Ignored(Ignored::NotPaused));
        };

        let now = self.clock.now();
        // A clock that stepped backwards must not shrink the paused total
        let pause_ms = ms_between(now, paused_at).max(0);
        let paused_for = Duration::milliseconds(pause_ms);
        let ends_at = end_time
            .checked_add_signed(paused_for)
            .ok_or_else(|| Error::Other("Pause pushes the planned end out of range".into()))?;

        self.session.total_paused_time = self.session.total_paused_time.saturating_add(pause_ms);
        self.session.end_time = Some(ends_at);
        self.session.paused_at = None;
        self.session.status = SessionStatus::Fasting;
        self.save_session()?;

        tracing::info!(
            "Resumed fast after {}s pause, planned end now {}",
            paused_for.num_seconds(),
            ends_at
        );
        Ok(Transition::Resumed {
            paused_for,
            ends_at,
        })
    }

    /// End the current session, archiving it if it lasted over a minute.
    ///
    /// The archived entry is keyed by today's local date and replaces any
    /// entry already recorded for that date.
    pub fn stop_fasting(&mut self, completed: bool) -> Result<Transition> {
        if !self.session.status.is_active() {
            return Ok(Transition::Ignored(Ignored::NotActive));
        }

        let now = self.clock.now();
        let duration_ms = self.get_elapsed_time();

        let archived = match self.session.start_time {
            Some(start_time) if duration_ms > MIN_ARCHIVED_DURATION_MS => {
                let entry = HistoryEntry {
                    date: self.clock.today(),
                    start_time,
                    end_time: now,
                    duration: duration_ms,
                    plan_id: self.session.plan.id.clone(),
                    completed,
                };
                self.history.record(entry.clone());
                self.history.save(&mut self.store)?;
                Some(entry)
            }
            _ => {
                tracing::debug!(
                    "Discarding {}ms session (minimum is over {}ms)",
                    duration_ms,
                    MIN_ARCHIVED_DURATION_MS
                );
                None
            }
        };

        let next_plan = self
            .current_plan
            .clone()
            .unwrap_or_else(|| self.session.plan.clone());
        self.session = FastingSession::idle(next_plan);
        self.save_session()?;

        tracing::info!(
            "Stopped fast after {}ms (completed: {}, archived: {})",
            duration_ms,
            completed,
            archived.is_some()
        );
        Ok(Transition::Stopped {
            duration_ms,
            archived,
        })
    }

    /// Select a catalog plan by id for the next fast
    pub fn select_plan(&mut self, id: &str) -> Result<FastingPlan> {
        let plan = self.catalog.require(id)?.clone();
        self.set_current_plan(plan.clone())?;
        Ok(plan)
    }

    /// Set the plan for the next fast. A running session keeps its own plan.
    pub fn set_current_plan(&mut self, plan: FastingPlan) -> Result<()> {
        tracing::info!("Selected plan {}", plan.id);
        self.current_plan = Some(plan.clone());
        store::save_record(&mut self.store, keys::CURRENT_PLAN, &self.current_plan)?;

        if self.session.status == SessionStatus::Idle {
            self.session.plan = plan;
            self.save_session()?;
        }
        Ok(())
    }

    /// Deselect the plan; `start_fasting` is ignored until one is chosen
    pub fn clear_current_plan(&mut self) -> Result<()> {
        self.current_plan = None;
        store::save_record(&mut self.store, keys::CURRENT_PLAN, &self.current_plan)
    }

    /// Wipe every stored record and return to first-run defaults
    pub fn reset_all(&mut self) -> Result<()> {
        store::clear_all(&mut self.store)?;

        let default_plan = self
            .catalog
            .default_plan()
            .cloned()
            .unwrap_or_else(|| self.session.plan.clone());
        self.current_plan = Some(default_plan.clone());
        self.session = FastingSession::idle(default_plan);
        self.history = HistoryLedger::default();
        Ok(())
    }

    fn save_session(&mut self) -> Result<()> {
        store::save_record(&mut self.store, keys::FASTING_SESSION, &self.session)
    }

    // ------------------------------------------------------------------------
    // Derived time metrics
    // ------------------------------------------------------------------------

    /// Net fasting milliseconds, paused time excluded.
    ///
    /// Frozen at the pause instant while Paused and at the planned end while
    /// Completed.
    pub fn get_elapsed_time(&self) -> i64 {
        let session = &self.session;
        let Some(start) = session.start_time else {
            return 0;
        };

        let until = match (session.status, session.paused_at, session.end_time) {
            (SessionStatus::Paused, Some(paused_at), _) => paused_at,
            (SessionStatus::Completed, _, Some(end_time)) => end_time,
            _ => self.clock.now(),
        };

        ms_between(until, start)
            .saturating_sub(session.total_paused_time)
            .max(0)
    }

    /// Target fasting milliseconds of the running session.
    ///
    /// Always `end - start - paused`, i.e. the plan's fast length.
    fn planned_ms(&self) -> Option<i64> {
        match (self.session.start_time, self.session.end_time) {
            (Some(start), Some(end)) => {
                Some(ms_between(end, start).saturating_sub(self.session.total_paused_time))
            }
            _ => None,
        }
    }

    pub fn get_remaining_time(&self) -> i64 {
        if !self.session.status.is_active() {
            return 0;
        }
        match self.planned_ms() {
            Some(planned) => planned.saturating_sub(self.get_elapsed_time()).max(0),
            None => 0,
        }
    }

    /// Percentage of the planned fast done, in `[0, 100]`
    pub fn get_progress(&self) -> f64 {
        if !self.session.status.is_active() {
            return 0.0;
        }
        match self.planned_ms() {
            Some(planned) if planned > 0 => {
                (self.get_elapsed_time() as f64 / planned as f64 * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    /// Whether a running fast has reached its planned duration
    pub fn is_due(&self) -> bool {
        self.session.status == SessionStatus::Fasting && self.get_remaining_time() == 0
    }

    // ------------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------------

    pub fn session(&self) -> &FastingSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn fasting_history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn fasting_plans(&self) -> &[FastingPlan] {
        self.catalog.plans()
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn current_plan(&self) -> Option<&FastingPlan> {
        self.current_plan.as_ref()
    }

    /// Planned completion instant, including pause shifts so far
    pub fn planned_end(&self) -> Option<DateTime<Utc>> {
        self.session.end_time
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
