//! User profile, weight log and water intake.
//!
//! These records sit beside the fasting core: the tracker never reads them,
//! but the dashboard and achievements do. Weight is one record per day
//! (the latest reading wins); water is one record per day with amounts
//! added together.

use crate::clock::Clock;
use crate::config::WaterConfig;
use crate::store::{self, keys, KeyValueStore};
use crate::types::{UserProfile, WaterRecord, WeightRecord};
use crate::{Error, Result};
use chrono::{Duration, NaiveDate};

/// WHO body-mass-index bands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ObesityClassI,
    ObesityClassII,
    ObesityClassIII,
}

impl BmiCategory {
    pub fn for_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else if bmi < 35.0 {
            BmiCategory::ObesityClassI
        } else if bmi < 40.0 {
            BmiCategory::ObesityClassII
        } else {
            BmiCategory::ObesityClassIII
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::ObesityClassI => "Obesity class I",
            BmiCategory::ObesityClassII => "Obesity class II",
            BmiCategory::ObesityClassIII => "Obesity class III",
        }
    }
}

/// Body mass index, None unless both weight and height are known
pub fn bmi(weight_kg: f64, height_cm: u32) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm == 0 {
        return None;
    }
    let height_m = f64::from(height_cm) / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// Profile and daily body records, written through to the store
pub struct ProfileBook<S: KeyValueStore, C: Clock> {
    store: S,
    clock: C,
    water_config: WaterConfig,
    profile: UserProfile,
    weights: Vec<WeightRecord>,
    water: Vec<WaterRecord>,
}

impl<S: KeyValueStore, C: Clock> ProfileBook<S, C> {
    /// Load all three records, each falling back to empty on corruption
    pub fn open(store: S, clock: C, water_config: WaterConfig) -> Self {
        let profile = store::load_or_else(&store, keys::USER_DATA, UserProfile::default);
        let weights = store::load_or_else(&store, keys::WEIGHT_HISTORY, Vec::new);
        let water = store::load_or_else(&store, keys::WATER_INTAKE, Vec::new);

        Self {
            store,
            clock,
            water_config,
            profile,
            weights,
            water,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn weight_history(&self) -> &[WeightRecord] {
        &self.weights
    }

    pub fn water_intake(&self) -> &[WaterRecord] {
        &self.water
    }

    /// Modify the profile in place and save it
    pub fn update_profile<F>(&mut self, f: F) -> Result<&UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        f(&mut self.profile);
        store::save_record(&mut self.store, keys::USER_DATA, &self.profile)?;
        tracing::debug!("Updated user profile");
        Ok(&self.profile)
    }

    /// Record today's weight, replacing any earlier reading from today.
    ///
    /// Also becomes the profile's current weight.
    pub fn add_weight_record(&mut self, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(Error::Other(format!("Invalid weight: {}", weight)));
        }

        let today = self.clock.today();
        match self.weights.iter_mut().find(|r| r.date == today) {
            Some(record) => record.weight = weight,
            None => self.weights.push(WeightRecord {
                date: today,
                weight,
            }),
        }
        store::save_record(&mut self.store, keys::WEIGHT_HISTORY, &self.weights)?;

        self.update_profile(|p| p.weight = weight)?;
        tracing::info!("Recorded weight {} kg for {}", weight, today);
        Ok(())
    }

    /// Add to today's water total, returning the new total in ml
    pub fn add_water_intake(&mut self, amount_ml: u32) -> Result<u32> {
        if amount_ml == 0 {
            return Err(Error::Other("Water amount must be positive".into()));
        }

        let today = self.clock.today();
        let total = match self.water.iter_mut().find(|r| r.date == today) {
            Some(record) => {
                record.amount = record.amount.saturating_add(amount_ml);
                record.amount
            }
            None => {
                self.water.push(WaterRecord {
                    date: today,
                    amount: amount_ml,
                });
                amount_ml
            }
        };
        store::save_record(&mut self.store, keys::WATER_INTAKE, &self.water)?;

        tracing::info!("Added {} ml water, {} ml today", amount_ml, total);
        Ok(total)
    }

    pub fn today_water_intake(&self) -> u32 {
        self.water_on(self.clock.today())
    }

    fn water_on(&self, date: NaiveDate) -> u32 {
        self.water
            .iter()
            .find(|r| r.date == date)
            .map(|r| r.amount)
            .unwrap_or(0)
    }

    /// Daily target in ml, scaled by body weight when it is known
    pub fn daily_water_goal(&self) -> u32 {
        if self.profile.weight > 0.0 {
            (self.profile.weight * f64::from(self.water_config.ml_per_kg)).round() as u32
        } else {
            self.water_config.default_goal_ml
        }
    }

    /// Today's intake as a percentage of the goal, capped at 100
    pub fn water_progress(&self) -> u32 {
        let goal = self.daily_water_goal();
        if goal == 0 {
            return 100;
        }
        let pct = (f64::from(self.today_water_intake()) / f64::from(goal) * 100.0).round();
        pct.min(100.0) as u32
    }

    /// The last `days` days of intake, oldest first, zero where nothing was logged
    pub fn water_last_days(&self, days: u32) -> Vec<WaterRecord> {
        let today = self.clock.today();
        (0..i64::from(days))
            .rev()
            .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
            .map(|date| WaterRecord {
                date,
                amount: self.water_on(date),
            })
            .collect()
    }

    /// The latest `count` weight records, sorted oldest first
    pub fn recent_weights(&self, count: usize) -> Vec<WeightRecord> {
        let mut sorted = self.weights.clone();
        sorted.sort_by_key(|r| r.date);
        let skip = sorted.len().saturating_sub(count);
        sorted.split_off(skip)
    }

    pub fn bmi(&self) -> Option<f64> {
        bmi(self.profile.weight, self.profile.height)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
