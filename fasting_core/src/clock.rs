//! Time sources.
//!
//! Every time-dependent computation in the tracker goes through a [`Clock`]
//! so tests (and the CLI's `--at` override) can supply synthetic time.
//! Calendar days are always derived in the host's local timezone at the
//! moment of the call.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Abstraction over the current instant.
pub trait Clock {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar day containing [`Clock::now`].
    fn today(&self) -> NaiveDate {
        local_date(self.now())
    }
}

/// Local calendar day of an instant.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Instant from epoch milliseconds.
///
/// Out-of-range values clamp to the epoch rather than panicking.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    pub fn from_millis(ms: i64) -> Self {
        Self::new(from_millis(ms))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}

/// Clock that only moves when told to.
///
/// Uses an atomic so a shared reference can be advanced from inside a
/// poller callback while the tracker holds its own reference.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.millis.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
