//! Users, cohorts and nutrition targets.
//!
//! A user's (age band, sex, activity level) triple selects one nutrition
//! target row after the activity override rules are applied. The target's
//! raw values are then turned into per-nutrient bounds on weekly totals.

use crate::{
    config::{
        nutrients::NutrientVocabulary,
        settings::{Band, Cohort, CohortRules},
    },
    core::snapshot::numeric_map,
    entities::{self, nutrition_target, user},
    errors::Result,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// The user fields the worker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Login name
    pub user_name: String,
    /// The user's own cohort, before overrides
    pub cohort: Cohort,
    /// Whether the menstruating-cohort iron floor applies
    pub menstruation: bool,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            user_name: model.user_name,
            cohort: Cohort {
                age_band: model.age_band,
                sex: model.sex,
                activity_level: model.activity_level,
            },
            menstruation: model.menstruation,
        }
    }
}

/// Finds a user by login name.
#[instrument(skip(db))]
pub async fn find_user(db: &DatabaseConnection, user_name: &str) -> Result<Option<UserProfile>> {
    let user = entities::User::find()
        .filter(user::Column::UserName.eq(user_name))
        .one(db)
        .await?;
    Ok(user.map(UserProfile::from))
}

/// Cohort used for the target lookup once activity overrides are applied.
#[must_use]
pub fn lookup_cohort(cohort: &Cohort, rules: &CohortRules) -> Cohort {
    let replacement = rules.activity_overrides.iter().find(|rule| {
        cohort.age_band.contains(&rule.age_contains) && cohort.activity_level == rule.activity_level
    });
    match replacement {
        Some(rule) => Cohort {
            activity_level: rule.replacement.clone(),
            ..cohort.clone()
        },
        None => cohort.clone(),
    }
}

/// Whether energy and PFC constraints apply to this (unoverridden) cohort.
#[must_use]
pub fn uses_pfc(cohort: &Cohort, rules: &CohortRules) -> bool {
    !rules.no_pfc.contains(cohort)
}

/// Raw nutrient values of one target row, keyed by target-side names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionTarget {
    values: BTreeMap<String, f64>,
}

impl NutritionTarget {
    /// Builds a target from raw values.
    #[must_use]
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    /// Value of a target key; `null` entries in the database are absent here.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

/// Loads the nutrition target matching `cohort` exactly.
#[instrument(skip(db))]
pub async fn find_nutrition_target(
    db: &DatabaseConnection,
    cohort: &Cohort,
) -> Result<Option<NutritionTarget>> {
    let row = entities::NutritionTarget::find()
        .filter(nutrition_target::Column::AgeBand.eq(cohort.age_band.as_str()))
        .filter(nutrition_target::Column::Sex.eq(cohort.sex.as_str()))
        .filter(nutrition_target::Column::ActivityLevel.eq(cohort.activity_level.as_str()))
        .order_by_asc(nutrition_target::Column::Id)
        .one(db)
        .await?;

    Ok(row.map(|row| {
        let values = numeric_map(&row.nutrients)
            .into_iter()
            .filter_map(|(key, value)| Some((key, value?)))
            .collect();
        debug!("Nutrition target {} matched cohort", row.id);
        NutritionTarget::new(values)
    }))
}

/// Bounds on the weekly total of one recipe-side nutrient.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientBound {
    /// Recipe-side nutrient key
    pub recipe_key: String,
    /// Weekly floor, if any
    pub lower: Option<f64>,
    /// Weekly ceiling, if any
    pub upper: Option<f64>,
}

/// How bounds are loosened when derived from a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundPolicy {
    /// Band around the energy target
    pub energy_band: Band,
    /// Solver tolerance; micronutrient ceilings ignore `upper`
    pub tolerance: Band,
}

/// Derives per-nutrient bounds from a target.
///
/// - energy: `[target·band.lower·tol.lower, target·band.upper·tol.upper]`
/// - PFC: percent of energy converted to grams, each side scaled by the tolerance
/// - micronutrients: floor scaled by `tol.lower`, ceiling kept as a hard limit;
///   the iron floor comes from the menstruation key when the flag is set
///
/// Nutrients with neither bound are omitted. Energy and PFC are omitted when
/// `use_pfc` is false or the target has no energy value.
#[must_use]
pub fn nutrient_bounds(
    target: &NutritionTarget,
    vocab: &NutrientVocabulary,
    policy: BoundPolicy,
    menstruation: bool,
    use_pfc: bool,
) -> Vec<NutrientBound> {
    let BoundPolicy {
        energy_band,
        tolerance,
    } = policy;
    let mut bounds = Vec::new();

    let energy = target.get(&vocab.energy.target_key);
    if let (true, Some(kcal)) = (use_pfc, energy) {
        bounds.push(NutrientBound {
            recipe_key: vocab.energy.recipe_key.clone(),
            lower: Some(kcal * energy_band.lower * tolerance.lower),
            upper: Some(kcal * energy_band.upper * tolerance.upper),
        });

        for macro_key in &vocab.macros {
            let grams = |percent: f64, ratio: f64| kcal * ratio * (percent / 100.0) / macro_key.kcal_per_gram;
            let lower = target
                .get(&vocab.lower_key(&macro_key.target_prefix))
                .map(|p| grams(p, tolerance.lower));
            let upper = target
                .get(&vocab.upper_key(&macro_key.target_prefix))
                .map(|p| grams(p, tolerance.upper));
            if lower.is_some() || upper.is_some() {
                bounds.push(NutrientBound {
                    recipe_key: macro_key.recipe_key.clone(),
                    lower,
                    upper,
                });
            }
        }
    }

    for micro in &vocab.micros {
        let lower_key = match (&micro.menstruation_lower_key, menstruation) {
            (Some(key), true) => key.clone(),
            _ => vocab.lower_key(&micro.target_prefix),
        };
        let lower = target.get(&lower_key).map(|v| v * tolerance.lower);
        let upper = target.get(&vocab.upper_key(&micro.target_prefix));
        if lower.is_some() || upper.is_some() {
            bounds.push(NutrientBound {
                recipe_key: micro.recipe_key.clone(),
                lower,
                upper,
            });
        }
    }

    bounds
}
