//! Core domain types for the Jejum fasting tracker.
//!
//! This module defines the records the tracker persists:
//! - Fasting plans and the singleton fasting session
//! - History entries for terminated sessions
//! - User profile, weight and water records
//!
//! Field names serialize in camelCase and instants as epoch milliseconds,
//! which is the layout of the persisted store documents.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one hour
pub const MS_PER_HOUR: i64 = 3_600_000;

// ============================================================================
// Plan Types
// ============================================================================

/// A named fast/eat ratio, e.g. 16:8
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastingPlan {
    pub id: String,
    pub name: String,
    pub fast_hours: u32,
    pub eat_hours: u32,
    pub description: String,
}

impl FastingPlan {
    /// Target fasting duration in milliseconds
    pub fn planned_duration_ms(&self) -> i64 {
        i64::from(self.fast_hours) * MS_PER_HOUR
    }

    pub fn planned_duration(&self) -> Duration {
        Duration::milliseconds(self.planned_duration_ms())
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle state of the fasting session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Fasting,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn is_active(self) -> bool {
        !matches!(self, SessionStatus::Idle)
    }
}

/// The single fasting session owned by the tracker
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastingSession {
    pub status: SessionStatus,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    /// Planned completion; moves forward by each pause on resume
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub paused_at: Option<DateTime<Utc>>,
    /// Cumulative paused milliseconds
    #[serde(default)]
    pub total_paused_time: i64,
    pub plan: FastingPlan,
}

impl FastingSession {
    /// An idle session that will use `plan` when started
    pub fn idle(plan: FastingPlan) -> Self {
        Self {
            status: SessionStatus::Idle,
            start_time: None,
            end_time: None,
            paused_at: None,
            total_paused_time: 0,
            plan,
        }
    }

    /// Whether the timestamps present match what the status requires.
    ///
    /// A running session must also satisfy
    /// `end - start - totalPausedTime == plan length`. Used on load to
    /// reject records that parse but cannot be driven.
    pub fn is_consistent(&self) -> bool {
        if self.total_paused_time < 0 {
            return false;
        }
        let fields_ok = match self.status {
            SessionStatus::Idle => {
                return self.start_time.is_none()
                    && self.end_time.is_none()
                    && self.paused_at.is_none();
            }
            SessionStatus::Fasting | SessionStatus::Completed => self.paused_at.is_none(),
            SessionStatus::Paused => self.paused_at.is_some(),
        };

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if fields_ok => {
                let planned = end
                    .timestamp_millis()
                    .checked_sub(start.timestamp_millis())
                    .and_then(|span| span.checked_sub(self.total_paused_time));
                planned == Some(self.plan.planned_duration_ms())
            }
            _ => false,
        }
    }
}

// ============================================================================
// History Types
// ============================================================================

/// A terminated session archived in the history ledger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Local calendar day the session was stopped on
    pub date: NaiveDate,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    /// Net fasting milliseconds, paused time excluded
    pub duration: i64,
    pub plan_id: String,
    pub completed: bool,
}

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Intense,
}

/// What the user wants out of fasting, picked during onboarding
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    #[serde(rename = "weightloss")]
    WeightLoss,
    Maintenance,
    Health,
    Energy,
}

/// Onboarding answers; zero means "not provided" for numeric fields
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub gender: Option<Gender>,
    pub age: u32,
    /// Centimetres
    pub height: u32,
    /// Kilograms
    pub weight: f64,
    pub target_weight: f64,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightRecord {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaterRecord {
    pub date: NaiveDate,
    /// Millilitres
    pub amount: u32,
}
