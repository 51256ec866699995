//! Periodic refresh and auto-completion.
//!
//! The tracker is passive: remaining time only changes because the clock
//! moves. A [`Poller`] re-reads it on a fixed interval and, once a running
//! fast reaches its planned end, stops it as completed.

use crate::clock::Clock;
use crate::session::{FastingTracker, Transition};
use crate::store::KeyValueStore;
use crate::types::{HistoryEntry, SessionStatus};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default refresh cadence for displays
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

/// What one refresh observed
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Idle,
    Running { remaining_ms: i64, progress: f64 },
    Paused { elapsed_ms: i64 },
    /// The fast hit its planned end on this tick and was stopped
    Completed { archived: Option<HistoryEntry> },
}

/// Refresh once, auto-completing a fast that has reached its planned end.
///
/// A stored session already marked Completed is archived the same way.
pub fn tick<S: KeyValueStore, C: Clock>(
    tracker: &mut FastingTracker<S, C>,
) -> Result<TickOutcome> {
    if tracker.is_due() || tracker.status() == SessionStatus::Completed {
        tracing::info!("Planned fasting time reached, completing");
        return match tracker.stop_fasting(true)? {
            Transition::Stopped { archived, .. } => Ok(TickOutcome::Completed { archived }),
            _ => Ok(TickOutcome::Idle),
        };
    }

    Ok(match tracker.status() {
        SessionStatus::Idle => TickOutcome::Idle,
        SessionStatus::Paused => TickOutcome::Paused {
            elapsed_ms: tracker.get_elapsed_time(),
        },
        SessionStatus::Fasting | SessionStatus::Completed => TickOutcome::Running {
            remaining_ms: tracker.get_remaining_time(),
            progress: tracker.get_progress(),
        },
    })
}

/// Shared flag that asks a running poller to stop before its next tick
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why [`Poller::run`] returned
#[derive(Clone, Debug, PartialEq)]
pub enum PollExit {
    Completed(Option<HistoryEntry>),
    Cancelled,
    /// Nothing to wait for: the session was idle
    NotActive,
}

pub struct Poller {
    interval: Duration,
    cancel: CancelHandle,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Tick until the fast completes, goes idle, or the handle is cancelled.
    ///
    /// `on_tick` sees every outcome, including the final one. Returning
    /// `false` from it ends this run without touching the cancel handle.
    pub fn run<S, C, F>(&self, tracker: &mut FastingTracker<S, C>, mut on_tick: F) -> Result<PollExit>
    where
        S: KeyValueStore,
        C: Clock,
        F: FnMut(&FastingTracker<S, C>, &TickOutcome) -> bool,
    {
        tracing::debug!("Polling every {}ms", self.interval.as_millis());

        loop {
            if self.cancel.is_cancelled() {
                return Ok(PollExit::Cancelled);
            }

            let outcome = tick(tracker)?;
            let keep_going = on_tick(tracker, &outcome);

            match outcome {
                TickOutcome::Completed { archived } => return Ok(PollExit::Completed(archived)),
                TickOutcome::Idle => return Ok(PollExit::NotActive),
                TickOutcome::Running { .. } | TickOutcome::Paused { .. } => {}
            }

            if !keep_going {
                return Ok(PollExit::Cancelled);
            }

            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::clock::{from_millis, ManualClock};
    use crate::store::MemoryStore;

    const HOUR: i64 = 3_600_000;

    fn tracker(clock: &ManualClock) -> FastingTracker<MemoryStore, &ManualClock> {
        crate::logging::init_test();
        FastingTracker::open(MemoryStore::new(), clock, build_default_catalog()).unwrap()
    }

    fn clock() -> ManualClock {
        ManualClock::new(from_millis(1_717_200_000_000))
    }

    #[test]
    fn test_tick_reports_running() {
        let clock = clock();
        let mut t = tracker(&clock);
        assert_eq!(tick(&mut t).unwrap(), TickOutcome::Idle);

        t.start_fasting().unwrap();
        clock.advance(chrono::Duration::hours(4));
        match tick(&mut t).unwrap() {
            TickOutcome::Running {
                remaining_ms,
                progress,
            } => {
                assert_eq!(remaining_ms, 12 * HOUR);
                assert!((progress - 25.0).abs() < 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_tick_completes_due_fast() {
        let clock = clock();
        let mut t = tracker(&clock);
        t.start_fasting().unwrap();
        clock.advance(chrono::Duration::hours(16));

        match tick(&mut t).unwrap() {
            TickOutcome::Completed { archived } => {
                let entry = archived.unwrap();
                assert!(entry.completed);
                assert_eq!(entry.duration, 16 * HOUR);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(t.status(), SessionStatus::Idle);
        assert_eq!(t.fasting_history().len(), 1);
    }

    #[test]
    fn test_paused_fast_never_completes() {
        let clock = clock();
        let mut t = tracker(&clock);
        t.start_fasting().unwrap();
        clock.advance(chrono::Duration::hours(1));
        t.pause_fasting().unwrap();
        clock.advance(chrono::Duration::hours(30));

        assert_eq!(
            tick(&mut t).unwrap(),
            TickOutcome::Paused { elapsed_ms: HOUR }
        );
        assert_eq!(t.status(), SessionStatus::Paused);
    }

    #[test]
    fn test_run_until_completed() {
        let clock = clock();
        let mut t = tracker(&clock);
        t.start_fasting().unwrap();

        let poller = Poller::new(Duration::ZERO);
        let mut ticks = 0;
        let exit = poller
            .run(&mut t, |_, _| {
                ticks += 1;
                clock.advance(chrono::Duration::hours(5));
                true
            })
            .unwrap();

        // 0h, 5h, 10h, 15h running; 20h completes
        assert_eq!(ticks, 5);
        assert!(matches!(exit, PollExit::Completed(Some(_))));
        assert_eq!(t.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_run_cancelled() {
        let clock = clock();
        let mut t = tracker(&clock);
        t.start_fasting().unwrap();

        let poller = Poller::new(Duration::ZERO);
        let handle = poller.cancel_handle();
        let mut ticks = 0;
        let exit = poller
            .run(&mut t, |_, _| {
                ticks += 1;
                if ticks == 3 {
                    handle.cancel();
                }
                true
            })
            .unwrap();

        assert_eq!(exit, PollExit::Cancelled);
        assert_eq!(ticks, 3);
        assert_eq!(t.status(), SessionStatus::Fasting);
    }

    #[test]
    fn test_run_stops_when_callback_declines() {
        let clock = clock();
        let mut t = tracker(&clock);
        t.start_fasting().unwrap();

        let poller = Poller::new(Duration::ZERO);
        let exit = poller.run(&mut t, |_, _| false).unwrap();
        assert_eq!(exit, PollExit::Cancelled);
        assert!(!poller.cancel_handle().is_cancelled());

        // The same poller can run again afterwards
        let mut ticks = 0;
        let exit = poller
            .run(&mut t, |_, _| {
                ticks += 1;
                ticks < 3
            })
            .unwrap();
        assert_eq!(exit, PollExit::Cancelled);
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_run_idle_returns_immediately() {
        let clock = clock();
        let mut t = tracker(&clock);
        let exit = Poller::new(Duration::ZERO).run(&mut t, |_, _| true).unwrap();
        assert_eq!(exit, PollExit::NotActive);
    }
}
