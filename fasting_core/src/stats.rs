//! Statistics over the fasting history.
//!
//! Everything here is a pure function of a history snapshot plus the
//! current local day. None of it assumes the ledger is sorted.

use crate::types::{HistoryEntry, UserProfile, WeightRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Percentage of entries marked completed, rounded; 0 for an empty history
pub fn completion_rate(entries: &[HistoryEntry]) -> u32 {
    if entries.is_empty() {
        return 0;
    }
    let completed = entries.iter().filter(|e| e.completed).count();
    (completed as f64 / entries.len() as f64 * 100.0).round() as u32
}

/// A duration broken into whole hours and minutes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Default)]
pub struct HoursMinutes {
    pub hours: i64,
    pub minutes: i64,
}

impl HoursMinutes {
    /// Whole hours, remaining minutes rounded to the nearest minute
    pub fn from_millis(ms: i64) -> Self {
        let total_minutes = ms as f64 / 60_000.0;
        let mut hours = (total_minutes / 60.0).floor() as i64;
        let mut minutes = (total_minutes % 60.0).round() as i64;
        if minutes == 60 {
            hours += 1;
            minutes = 0;
        }
        Self { hours, minutes }
    }
}

impl fmt::Display for HoursMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// Sum of net fasting time across all entries
pub fn total_fasting_duration(entries: &[HistoryEntry]) -> HoursMinutes {
    HoursMinutes::from_millis(entries.iter().map(|e| e.duration).sum())
}

/// Consecutive days with a completed fast, ending today or yesterday.
///
/// Counting starts today when today already has a completed fast,
/// otherwise yesterday, so an unfinished day does not break the run yet.
/// This differs from starting at today whenever today has any entry: an
/// incomplete fast logged today leaves the run ending yesterday intact
/// instead of reporting 0. Any earlier day without a completed entry ends
/// the streak.
pub fn current_streak(entries: &[HistoryEntry], today: NaiveDate) -> u32 {
    let completed_days: HashSet<NaiveDate> = entries
        .iter()
        .filter(|e| e.completed)
        .map(|e| e.date)
        .collect();

    let mut day = if completed_days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    while let Some(d) = day {
        if !completed_days.contains(&d) {
            break;
        }
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

/// Experience level by number of recorded fasts
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
    Master,
}

impl Tier {
    pub fn for_count(total: usize) -> Self {
        match total {
            0..=2 => Tier::Beginner,
            3..=9 => Tier::Intermediate,
            10..=19 => Tier::Advanced,
            _ => Tier::Master,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Intermediate => "Intermediate",
            Tier::Advanced => "Advanced",
            Tier::Master => "Master",
        }
    }

    /// Fast count needed to leave this tier, None at the top
    pub fn next_threshold(self) -> Option<usize> {
        match self {
            Tier::Beginner => Some(3),
            Tier::Intermediate => Some(10),
            Tier::Advanced => Some(20),
            Tier::Master => None,
        }
    }

    /// Progress towards the next tier, e.g. "4/10 fasts"
    pub fn milestone(self, total: usize) -> String {
        match (self, self.next_threshold()) {
            // Beginners see 0/3 until they level up
            (Tier::Beginner, Some(next)) => format!("0/{} fasts", next),
            (_, Some(next)) => format!("{}/{} fasts", total, next),
            (_, None) => format!("{} fasts", total),
        }
    }
}

/// Summary shown on the progress dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FastingStats {
    pub total: usize,
    pub completed: usize,
    pub completion_rate: u32,
    pub total_duration: HoursMinutes,
    pub current_streak: u32,
    pub tier: Tier,
}

impl FastingStats {
    pub fn compute(entries: &[HistoryEntry], today: NaiveDate) -> Self {
        let total = entries.len();
        Self {
            total,
            completed: entries.iter().filter(|e| e.completed).count(),
            completion_rate: completion_rate(entries),
            total_duration: total_fasting_duration(entries),
            current_streak: current_streak(entries, today),
            tier: Tier::for_count(total),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstFast,
    ThreeDayStreak,
    FiveCompletedFasts,
    FirstKiloLost,
}

impl Achievement {
    pub const ALL: [Achievement; 4] = [
        Achievement::FirstFast,
        Achievement::ThreeDayStreak,
        Achievement::FiveCompletedFasts,
        Achievement::FirstKiloLost,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstFast => "Complete your first fast",
            Achievement::ThreeDayStreak => "Fast 3 days in a row",
            Achievement::FiveCompletedFasts => "Complete 5 full fasts",
            Achievement::FirstKiloLost => "Lose your first kilo",
        }
    }
}

/// Achievements unlocked so far.
///
/// Weight loss is measured against the earliest weight record by date.
pub fn unlocked_achievements(
    stats: &FastingStats,
    profile: &UserProfile,
    weights: &[WeightRecord],
) -> Vec<Achievement> {
    let first_weight = weights.iter().min_by_key(|w| w.date).map(|w| w.weight);
    let lost_a_kilo = match first_weight {
        Some(first) => profile.weight > 0.0 && first - profile.weight >= 1.0,
        None => false,
    };

    Achievement::ALL
        .into_iter()
        .filter(|a| match a {
            Achievement::FirstFast => stats.total >= 1,
            Achievement::ThreeDayStreak => stats.current_streak >= 3,
            Achievement::FiveCompletedFasts => stats.completed >= 5,
            Achievement::FirstKiloLost => lost_a_kilo,
        })
        .collect()
}
