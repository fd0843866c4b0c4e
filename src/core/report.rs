//! Report generation over a stored menu.
//!
//! This module provides the two views a user gets of a finished week: the
//! shopping list (how much of each ingredient to buy) and the nutrition report
//! (what the week adds up to next to the user's target ranges). All functions
//! return structured data; presentation belongs to the caller.

use crate::{
    config::{nutrients::NutrientVocabulary, settings::CohortRules},
    core::{
        equivalence::EquivalenceResolver,
        menu::{WeeklyMenu, get_menu},
        snapshot::ReferenceSnapshot,
        target::{NutritionTarget, find_nutrition_target, find_user, lookup_cohort},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::{BTreeMap, BTreeSet};

/// Width of the energy range shown next to the weekly total.
const ENERGY_RANGE: f64 = 0.1;

/// Ingredients needed for one week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingList {
    /// Grams per ingredient, keyed by equivalence representative
    pub items: BTreeMap<String, f64>,
    /// Number of ingredients with a non-zero quantity
    pub total_types: usize,
}

/// Builds the shopping list for a week.
///
/// Each distinct recipe contributes its ingredient table once, however often
/// it is served.
#[must_use]
pub fn shopping_list(
    week: &WeeklyMenu,
    snapshot: &ReferenceSnapshot,
    resolver: &EquivalenceResolver,
) -> ShoppingList {
    let recipe_ids: BTreeSet<i64> = week.servings().collect();

    let mut items: BTreeMap<String, f64> = BTreeMap::new();
    for recipe in recipe_ids.iter().filter_map(|id| snapshot.recipe(*id)) {
        for (name, grams) in &recipe.ingredients {
            *items
                .entry(resolver.representative(name).to_string())
                .or_insert(0.0) += grams;
        }
    }

    let total_types = items.values().filter(|grams| **grams != 0.0).count();
    ShoppingList { items, total_types }
}

/// Target range of one nutrient, before any solver tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientRange {
    /// Floor, if the target declares one
    pub min: Option<f64>,
    /// Ceiling, if the target declares one
    pub max: Option<f64>,
}

/// Weekly nutrient totals next to the user's target ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionReport {
    /// Summed nutrients over every serving, rounded to 4 significant digits
    pub totals: BTreeMap<String, f64>,
    /// Target ranges keyed by recipe-side nutrient name
    pub targets: BTreeMap<String, NutrientRange>,
}

/// Rounds to `digits` significant digits, halves away from zero.
#[must_use]
pub fn sig_round(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    #[allow(clippy::cast_possible_truncation)]
    let magnitude = value.abs().log10().floor() as i32;
    let shift = digits - magnitude - 1;
    if shift >= 0 {
        let scale = 10f64.powi(shift);
        (value * scale).round() / scale
    } else {
        let scale = 10f64.powi(-shift);
        (value / scale).round() * scale
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unloosened target ranges.
///
/// Energy is shown as ±10% (truncated to whole kcal), macronutrient percents
/// are converted to grams and micronutrient values are shown as stored.
#[must_use]
pub fn target_ranges(
    target: &NutritionTarget,
    vocab: &NutrientVocabulary,
    menstruation: bool,
) -> BTreeMap<String, NutrientRange> {
    let mut ranges = BTreeMap::new();

    let energy = target.get(&vocab.energy.target_key);
    if let Some(kcal) = energy {
        ranges.insert(
            vocab.energy.recipe_key.clone(),
            NutrientRange {
                min: Some((kcal * (1.0 - ENERGY_RANGE)).trunc()),
                max: Some((kcal * (1.0 + ENERGY_RANGE)).trunc()),
            },
        );
    }

    for macro_key in &vocab.macros {
        let grams = |key: String| {
            let percent = target.get(&key)?;
            Some(round2(energy? * percent / 100.0 / macro_key.kcal_per_gram))
        };
        let range = NutrientRange {
            min: grams(vocab.lower_key(&macro_key.target_prefix)),
            max: grams(vocab.upper_key(&macro_key.target_prefix)),
        };
        if range.min.is_some() || range.max.is_some() {
            ranges.insert(macro_key.recipe_key.clone(), range);
        }
    }

    for micro in &vocab.micros {
        let regular_floor = target.get(&vocab.lower_key(&micro.target_prefix));
        let min = match (&micro.menstruation_lower_key, menstruation) {
            (Some(key), true) => target.get(key).or(regular_floor),
            _ => regular_floor,
        };
        let range = NutrientRange {
            min,
            max: target.get(&vocab.upper_key(&micro.target_prefix)),
        };
        if range.min.is_some() || range.max.is_some() {
            ranges.insert(micro.recipe_key.clone(), range);
        }
    }

    ranges
}

/// Builds the nutrition report for a week.
#[must_use]
pub fn nutrition_report(
    week: &WeeklyMenu,
    snapshot: &ReferenceSnapshot,
    target: Option<&NutritionTarget>,
    vocab: &NutrientVocabulary,
    menstruation: bool,
) -> NutritionReport {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for recipe in week.servings().filter_map(|id| snapshot.recipe(id)) {
        for (key, amount) in &recipe.nutrients {
            *totals.entry(key.clone()).or_insert(0.0) += amount;
        }
    }

    NutritionReport {
        totals: totals
            .into_iter()
            .map(|(key, total)| (key, sig_round(total, 4)))
            .collect(),
        targets: target
            .map(|t| target_ranges(t, vocab, menstruation))
            .unwrap_or_default(),
    }
}

/// Shopping list for the user's stored menu; empty when there is none.
pub async fn generate_shopping_list(
    db: &DatabaseConnection,
    snapshot: &ReferenceSnapshot,
    resolver: &EquivalenceResolver,
    user_name: &str,
) -> Result<ShoppingList> {
    Ok(get_menu(db, user_name)
        .await?
        .map(|week| shopping_list(&week, snapshot, resolver))
        .unwrap_or_default())
}

/// Nutrition report for the user's stored menu; empty when there is none.
///
/// The target is looked up the same way the worker does, activity overrides
/// included. Unknown users or cohorts yield totals without target ranges.
pub async fn generate_nutrition_report(
    db: &DatabaseConnection,
    snapshot: &ReferenceSnapshot,
    vocab: &NutrientVocabulary,
    rules: &CohortRules,
    user_name: &str,
) -> Result<NutritionReport> {
    let Some(week) = get_menu(db, user_name).await? else {
        return Ok(NutritionReport::default());
    };

    let user = find_user(db, user_name).await?;
    let target = match &user {
        Some(user) => find_nutrition_target(db, &lookup_cohort(&user.cohort, rules)).await?,
        None => None,
    };
    let menstruation = user.as_ref().is_some_and(|u| u.menstruation);

    Ok(nutrition_report(
        &week,
        snapshot,
        target.as_ref(),
        vocab,
        menstruation,
    ))
}
