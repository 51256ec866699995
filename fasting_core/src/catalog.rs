//! Default catalog of fasting plans.
//!
//! The built-in plans are immutable. Custom plans from the config file are
//! appended on top; lookups are always by plan id so plans may come and go
//! between versions without breaking stored sessions.

use crate::types::{ActivityLevel, FastingPlan, Goal};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Longest fasting or eating window a plan may declare, one year
pub const MAX_PLAN_HOURS: u32 = 24 * 365;

/// Id of the plan used when nothing else is selected
pub const DEFAULT_PLAN_ID: &str = "16-8";

/// Cached default catalog, built once on first use
static DEFAULT_CATALOG: Lazy<PlanCatalog> = Lazy::new(build_default_catalog);

/// Ordered set of fasting plans
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    plans: Vec<FastingPlan>,
    default_id: String,
}

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static PlanCatalog {
    &DEFAULT_CATALOG
}

/// Builds the catalog of built-in plans
///
/// **Note**: prefer `get_default_catalog()` unless the catalog is going to be
/// extended with custom plans.
pub fn build_default_catalog() -> PlanCatalog {
    let plan = |id: &str, name: &str, fast_hours: u32, eat_hours: u32, description: &str| {
        FastingPlan {
            id: id.into(),
            name: name.into(),
            fast_hours,
            eat_hours,
            description: description.into(),
        }
    };

    PlanCatalog {
        default_id: DEFAULT_PLAN_ID.to_string(),
        plans: vec![
            plan("16-8", "16:8", 16, 8, "Classic and most popular"),
            plan("18-6", "18:6", 18, 6, "Intermediate, great results"),
            plan("20-4", "20:4", 20, 4, "Challenging, quick results"),
            plan("14-10", "14:10", 14, 10, "For beginners"),
            plan("24-0", "24 hours", 24, 0, "Extended fast"),
        ],
    }
}

impl PlanCatalog {
    pub fn new(plans: Vec<FastingPlan>) -> Self {
        Self {
            plans,
            default_id: DEFAULT_PLAN_ID.to_string(),
        }
    }

    /// Catalog with extra plans appended.
    ///
    /// A custom plan whose id collides with an existing one replaces it in
    /// place, so config can tweak a built-in plan's description.
    pub fn with_custom(&self, custom: &[FastingPlan]) -> Self {
        let mut plans = self.plans.clone();
        for extra in custom {
            match plans.iter_mut().find(|p| p.id == extra.id) {
                Some(existing) => *existing = extra.clone(),
                None => plans.push(extra.clone()),
            }
        }
        Self {
            plans,
            default_id: self.default_id.clone(),
        }
    }

    /// Use `id` as the first-run plan instead of 16:8
    pub fn with_default_plan(mut self, id: &str) -> Result<Self> {
        self.require(id)?;
        self.default_id = id.to_string();
        Ok(self)
    }

    pub fn plans(&self) -> &[FastingPlan] {
        &self.plans
    }

    pub fn get(&self, id: &str) -> Option<&FastingPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// Like [`PlanCatalog::get`] but reports a missing id as an error
    pub fn require(&self, id: &str) -> Result<&FastingPlan> {
        self.get(id)
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))
    }

    /// The default plan (16:8 unless overridden), or the first plan if the
    /// catalog lacks it
    pub fn default_plan(&self) -> Option<&FastingPlan> {
        self.get(&self.default_id).or_else(|| self.plans.first())
    }

    /// Check catalog invariants, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.plans.is_empty() {
            errors.push("Catalog has no plans".to_string());
        }

        for plan in &self.plans {
            if plan.id.trim().is_empty() {
                errors.push(format!("Plan '{}' has an empty id", plan.name));
            }
            if !seen.insert(plan.id.as_str()) {
                errors.push(format!("Duplicate plan id: {}", plan.id));
            }
            if plan.fast_hours == 0 {
                errors.push(format!("Plan {} must fast for at least one hour", plan.id));
            }
            if plan.fast_hours > MAX_PLAN_HOURS || plan.eat_hours > MAX_PLAN_HOURS {
                errors.push(format!(
                    "Plan {} exceeds the {}h limit",
                    plan.id, MAX_PLAN_HOURS
                ));
            }
        }

        errors
    }
}

/// Plan recommended from the onboarding questionnaire answers
pub fn recommend_plan_id(goal: Option<Goal>, activity: Option<ActivityLevel>) -> &'static str {
    match (goal, activity) {
        (Some(Goal::WeightLoss), Some(ActivityLevel::Moderate)) => "18-6",
        (Some(Goal::WeightLoss), Some(ActivityLevel::Intense)) => "16-8",
        (Some(Goal::Maintenance), _) => "14-10",
        (Some(Goal::Health | Goal::Energy), _) => "16-8",
        _ => DEFAULT_PLAN_ID,
    }
}
