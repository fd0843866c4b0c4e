//! Shared test utilities for the menu planner.
//!
//! This module provides common helper functions for setting up test databases,
//! seeding reference rows, and a small recipe catalogue that admits a
//! structurally valid week, plus scripted solvers that need no external binary.

use crate::{
    config::{nutrients::NutrientVocabulary, settings::ModelConfig},
    core::{
        DAYS,
        builder::{MenuModel, ModelInput, build_model},
        equivalence::EquivalenceResolver,
        program::LinearProgram,
        snapshot::{Category, Equivalence, Recipe, ReferenceSnapshot, numeric_map},
        solver::{SolveOptions, Solution, Solver, TerminationCondition},
        target::NutritionTarget,
    },
    entities::{
        item_equal, item_weight, nutrition_target, recipe, recipe_item, recipe_nutrition, user,
    },
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Plain rice, may be served every day.
pub const RICE_ID: i64 = 1;
/// Rice ball made from 米, equivalent to ご飯.
pub const ONIGIRI_ID: i64 = 2;
/// Curry rice, a special staple that fills the main slot.
pub const CURRY_ID: i64 = 3;
/// One main dish per day.
pub const MAIN_IDS: [i64; 7] = [11, 12, 13, 14, 15, 16, 17];
/// One side dish per day.
pub const SIDE_IDS: [i64; 7] = [21, 22, 23, 24, 25, 26, 27];
/// One soup per day; `SOUP_IDS[1]` uses tofu, which comes in 300 g packs.
pub const SOUP_IDS: [i64; 7] = [31, 32, 33, 34, 35, 36, 37];
/// Age band of the sample nutrition target.
pub const SAMPLE_AGE: &str = "30~49(歳)";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a recipe with its ingredient and nutrient rows.
pub async fn insert_recipe(
    db: &DatabaseConnection,
    recipe_id: i64,
    kind1: &str,
    kind2: &str,
    items: Value,
    nutritions: Value,
) -> Result<()> {
    recipe::ActiveModel {
        recipe_id: Set(recipe_id),
        title: Set(format!("recipe {recipe_id}")),
        kind1: Set(kind1.to_string()),
        kind2: Set(kind2.to_string()),
    }
    .insert(db)
    .await?;
    recipe_item::ActiveModel {
        recipe_id: Set(recipe_id),
        items: Set(items),
    }
    .insert(db)
    .await?;
    recipe_nutrition::ActiveModel {
        recipe_id: Set(recipe_id),
        nutritions: Set(nutritions),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Inserts package unit weights for an ingredient.
pub async fn insert_item_weight(db: &DatabaseConnection, item_name: &str, weights: Value) -> Result<()> {
    item_weight::ActiveModel {
        item_name: Set(item_name.to_string()),
        weights: Set(weights),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Inserts an equivalence row; `equals` may list several names separated by commas.
pub async fn insert_item_equal(db: &DatabaseConnection, item_name: &str, equals: &str) -> Result<()> {
    item_equal::ActiveModel {
        item_name: Set(item_name.to_string()),
        equals: Set(equals.to_string()),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Inserts a user.
pub async fn insert_user(
    db: &DatabaseConnection,
    user_name: &str,
    age_band: &str,
    sex: &str,
    activity_level: &str,
    menstruation: bool,
) -> Result<user::Model> {
    Ok(user::ActiveModel {
        user_name: Set(user_name.to_string()),
        age_band: Set(age_band.to_string()),
        sex: Set(sex.to_string()),
        activity_level: Set(activity_level.to_string()),
        menstruation: Set(menstruation),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Inserts a nutrition target row.
pub async fn insert_target(
    db: &DatabaseConnection,
    age_band: &str,
    sex: &str,
    activity_level: &str,
    nutrients: Value,
) -> Result<nutrition_target::Model> {
    Ok(nutrition_target::ActiveModel {
        age_band: Set(age_band.to_string()),
        sex: Set(sex.to_string()),
        activity_level: Set(activity_level.to_string()),
        nutrients: Set(nutrients),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

fn nutrients(kcal: f64, protein: f64, fat: f64, carbs: f64, calcium: f64, iron: f64) -> Value {
    json!({
        "カロリー(kcal)": kcal,
        "たんぱく質(g)": protein,
        "脂質(g)": fat,
        "炭水化物(g)": carbs,
        "カルシウム(mg)": calcium,
        "鉄(mg)": iron,
    })
}

/// `(recipe_id, kind1, kind2, ingredients, nutrients)` of the sample catalogue.
///
/// Rice with one main, side and soup comes to 2000 kcal a day, which meets
/// every weekly bound of [`sample_target_json`].
fn catalogue() -> Vec<(i64, Category, &'static str, Value, Value)> {
    let mut rows = vec![
        (RICE_ID, Category::Staple, "ご飯", json!({"ご飯": 150}), nutrients(250.0, 4.0, 0.5, 55.0, 5.0, 0.2)),
        (ONIGIRI_ID, Category::Staple, "おにぎり", json!({"米": 100, "海苔": 3}), nutrients(360.0, 6.0, 1.0, 77.0, 10.0, 0.5)),
        (CURRY_ID, Category::Staple, "カレー", json!({"ご飯": 200, "豚肉": 60, "カレールー": 20}), nutrients(750.0, 20.0, 25.0, 100.0, 40.0, 1.5)),
    ];

    let mains = [
        json!({"鶏肉": 120, "醤油": 10}),
        json!({"豚肉": 100, "玉ねぎ": 50}),
        json!({"鮭": 80}),
        json!({"牛肉": 90, "玉ねぎ": 40}),
        json!({"鶏肉": 100, "卵": 50}),
        json!({"さば": 90, "味噌": 10}),
        json!({"豆腐": 150, "豚肉": 50}),
    ];
    let sides = [
        json!({"ほうれん草": 80}),
        json!({"キャベツ": 60}),
        json!({"にんじん": 50, "ごぼう": 30}),
        json!({"トマト": 100}),
        json!({"きゅうり": 60, "わかめ": 5}),
        json!({"ブロッコリー": 70}),
        json!({"卵": 50, "ほうれん草": 30}),
    ];
    let soups = [
        json!({"味噌": 12, "わかめ": 3}),
        json!({"豆腐": 120, "味噌": 12}),
        json!({"大根": 50, "味噌": 12}),
        json!({"卵": 25}),
        json!({"玉ねぎ": 40}),
        json!({"じゃがいも": 50, "味噌": 12}),
        json!({"キャベツ": 30}),
    ];

    for (i, items) in mains.into_iter().enumerate() {
        rows.push((MAIN_IDS[i], Category::Main, "主菜", items, nutrients(850.0, 50.0, 35.0, 60.0, 150.0, 5.0)));
    }
    for (i, items) in sides.into_iter().enumerate() {
        rows.push((SIDE_IDS[i], Category::Side, "副菜", items, nutrients(450.0, 12.0, 10.0, 85.0, 450.0, 5.0)));
    }
    for (i, items) in soups.into_iter().enumerate() {
        rows.push((SOUP_IDS[i], Category::Soup, "汁物", items, nutrients(450.0, 14.0, 9.5, 90.0, 395.0, 4.8)));
    }
    rows
}

/// The sample catalogue as typed recipes.
pub fn sample_recipes() -> Vec<Recipe> {
    let as_map = |value: &Value| -> BTreeMap<String, f64> {
        numeric_map(value)
            .into_iter()
            .filter_map(|(k, v)| Some((k, v?)))
            .collect()
    };
    catalogue()
        .into_iter()
        .map(|(id, category, kind2, items, nutrients)| Recipe {
            id,
            category,
            subcategory: kind2.to_string(),
            nutrients: as_map(&nutrients),
            ingredients: as_map(&items),
        })
        .collect()
}

/// Snapshot over the sample catalogue, matching [`seed_reference_data`].
pub fn sample_snapshot() -> ReferenceSnapshot {
    ReferenceSnapshot::new(
        sample_recipes(),
        [("豆腐".to_string(), vec![300.0]), ("卵".to_string(), vec![50.0])]
            .into_iter()
            .collect(),
        vec![Equivalence {
            canonical: "白米".to_string(),
            equal: "ご飯".to_string(),
        }],
    )
}

/// Writes the sample catalogue, unit weights and equivalences to the database.
pub async fn seed_reference_data(db: &DatabaseConnection) -> Result<()> {
    for (id, category, kind2, items, nutrients) in catalogue() {
        insert_recipe(db, id, category.as_str(), kind2, items, nutrients).await?;
    }
    insert_item_weight(db, "豆腐", json!([300])).await?;
    insert_item_weight(db, "卵", json!([50])).await?;
    insert_item_equal(db, "白米", "ご飯").await?;
    Ok(())
}

/// Weekly nutrition target for the sample cohort, as stored.
pub fn sample_target_json() -> Value {
    json!({
        "カロリー": 14000,
        "たんぱく質_下限": 13,
        "たんぱく質_上限": 20,
        "脂質_下限": 20,
        "脂質_上限": 30,
        "炭水化物_下限": 50,
        "炭水化物_上限": 65,
        "カルシウム_下限": 4000,
        "カルシウム_上限": 17500,
        "鉄_下限": 70,
        "鉄・月経時_下限": 100,
        "鉄_上限": 280,
        "ビタミンD_下限": null,
    })
}

/// [`sample_target_json`] as a typed target.
pub fn sample_target() -> NutritionTarget {
    NutritionTarget::new(
        numeric_map(&sample_target_json())
            .into_iter()
            .filter_map(|(k, v)| Some((k, v?)))
            .collect(),
    )
}

/// Rice, the day's main, side and soup on each of the seven days.
pub fn valid_week_picks() -> Vec<(u8, i64)> {
    DAYS.into_iter()
        .flat_map(|day| {
            let i = usize::from(day) - 1;
            [
                (day, RICE_ID),
                (day, MAIN_IDS[i]),
                (day, SIDE_IDS[i]),
                (day, SOUP_IDS[i]),
            ]
        })
        .collect()
}

/// Model over the sample snapshot and target with default settings.
pub fn sample_model() -> MenuModel {
    let snapshot = sample_snapshot();
    let config = ModelConfig::default();
    let resolver = EquivalenceResolver::new(
        snapshot.equivalences(),
        &config.equivalence_bridges,
        &snapshot.active_ingredients(),
    );
    let target = sample_target();
    let registered = BTreeMap::new();
    let input = ModelInput {
        snapshot: &snapshot,
        resolver: &resolver,
        target: &target,
        menstruation: false,
        use_pfc: true,
        registered_items: &registered,
    };
    build_model(&input, &config, &NutrientVocabulary::default())
}

/// One value per variable with the picked `x[d,r]` set to 1.
pub fn solution_values(model: &MenuModel, picks: &[(u8, i64)]) -> Vec<f64> {
    let mut values = vec![0.0; model.program.variables().len()];
    for &(day, recipe_id) in picks {
        if let Some(var) = model.selection_var(day, recipe_id) {
            values[var.index()] = 1.0;
        }
    }
    values
}

/// Answers every solve with a fixed set of `x[d,r]` picks.
#[derive(Debug, Clone)]
pub struct ScriptedSolver {
    termination: TerminationCondition,
    picks: Vec<(u8, i64)>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSolver {
    /// Solver reporting `termination` with the given picks.
    pub fn new(termination: TerminationCondition, picks: Vec<(u8, i64)>) -> Self {
        Self {
            termination,
            picks,
            seen: Arc::default(),
        }
    }

    /// Solver reporting an optimal solve with the given picks.
    pub fn optimal(picks: Vec<(u8, i64)>) -> Self {
        Self::new(TerminationCondition::Optimal, picks)
    }

    /// Variable names of the last program solved.
    pub fn seen_variables(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

impl Solver for ScriptedSolver {
    async fn solve(&self, program: &LinearProgram, _options: &SolveOptions) -> Result<Solution> {
        let mut values = vec![0.0; program.variables().len()];
        for (day, recipe_id) in &self.picks {
            if let Some(var) = program.find_variable(&format!("x[{day},{recipe_id}]")) {
                values[var.index()] = 1.0;
            }
        }
        if let Ok(mut seen) = self.seen.lock() {
            *seen = program.variables().iter().map(|v| v.name.clone()).collect();
        }
        let objective = program.objective_value(&values);
        Ok(Solution::new(self.termination, Some(objective), values))
    }
}

/// Fails every solve, like a crashed solver process.
#[derive(Debug, Clone, Copy)]
pub struct FailingSolver;

impl Solver for FailingSolver {
    async fn solve(&self, _program: &LinearProgram, _options: &SolveOptions) -> Result<Solution> {
        Err(Error::Solver {
            message: "cbc exited with status Some(1)".to_string(),
        })
    }
}
