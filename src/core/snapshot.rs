//! Reference data snapshot.
//!
//! Recipes, their ingredient and nutrient tables, package unit weights and
//! equivalence declarations are loaded once per worker lifetime into a
//! [`ReferenceSnapshot`]. The snapshot is read-only afterwards and is passed
//! by reference into every model build.

use crate::{
    entities::{self, recipe},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, prelude::Json};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Meal category (`kind1`) of a recipe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Rice, bread, noodles
    Staple,
    /// Main dish
    Main,
    /// Side dish
    Side,
    /// Soup
    Soup,
}

impl Category {
    /// All categories in menu order.
    pub const ALL: [Self; 4] = [Self::Staple, Self::Main, Self::Side, Self::Soup];

    /// Name used in the database and in stored menus.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staple => "staple",
            Self::Main => "main",
            Self::Side => "side",
            Self::Soup => "soup",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "staple" => Ok(Self::Staple),
            "main" => Ok(Self::Main),
            "side" => Ok(Self::Side),
            "soup" => Ok(Self::Soup),
            other => Err(format!("unknown meal category '{other}'")),
        }
    }
}

/// One dish with everything the model builder needs to know about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    /// Recipe identifier
    pub id: i64,
    /// Meal category (`kind1`)
    pub category: Category,
    /// Subcategory (`kind2`)
    pub subcategory: String,
    /// Nutrient amounts keyed by recipe-side nutrient names
    pub nutrients: BTreeMap<String, f64>,
    /// Grams per ingredient, never negative
    pub ingredients: BTreeMap<String, f64>,
}

impl Recipe {
    /// Amount of a nutrient; missing keys count as zero.
    #[must_use]
    pub fn nutrient(&self, key: &str) -> f64 {
        self.nutrients.get(key).copied().unwrap_or(0.0)
    }

    /// Grams of an ingredient; missing ingredients count as zero.
    #[must_use]
    pub fn grams(&self, ingredient: &str) -> f64 {
        self.ingredients.get(ingredient).copied().unwrap_or(0.0)
    }
}

/// Declares `equal` interchangeable with `canonical`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalence {
    /// Canonical name
    pub canonical: String,
    /// Interchangeable name
    pub equal: String,
}

/// Read-only reference data shared by every job of one worker.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    recipes: BTreeMap<i64, Recipe>,
    unit_weights: BTreeMap<String, Vec<f64>>,
    equivalences: Vec<Equivalence>,
}

impl ReferenceSnapshot {
    /// Builds a snapshot from already-typed data.
    #[must_use]
    pub fn new(
        recipes: impl IntoIterator<Item = Recipe>,
        unit_weights: BTreeMap<String, Vec<f64>>,
        equivalences: Vec<Equivalence>,
    ) -> Self {
        Self {
            recipes: recipes.into_iter().map(|r| (r.id, r)).collect(),
            unit_weights,
            equivalences,
        }
    }

    /// Loads every reference table.
    ///
    /// Recipes without an ingredient or nutrient row get empty tables. A recipe
    /// whose `kind1` is not a known category is rejected.
    pub async fn load(db: &DatabaseConnection) -> Result<Self> {
        let recipe_rows = entities::Recipe::find()
            .order_by_asc(recipe::Column::RecipeId)
            .all(db)
            .await?;

        let mut item_rows: HashMap<i64, Json> = entities::RecipeItem::find()
            .all(db)
            .await?
            .into_iter()
            .map(|row| (row.recipe_id, row.items))
            .collect();

        let mut nutrition_rows: HashMap<i64, Json> = entities::RecipeNutrition::find()
            .all(db)
            .await?
            .into_iter()
            .map(|row| (row.recipe_id, row.nutritions))
            .collect();

        let mut recipes = Vec::with_capacity(recipe_rows.len());
        for row in recipe_rows {
            let category = row
                .kind1
                .parse::<Category>()
                .map_err(|reason| Error::InvalidRecipe {
                    recipe_id: row.recipe_id,
                    reason,
                })?;
            let ingredients = item_rows
                .remove(&row.recipe_id)
                .map(|json| ingredient_grams(row.recipe_id, &json))
                .unwrap_or_default();
            let nutrients: BTreeMap<String, f64> = nutrition_rows
                .remove(&row.recipe_id)
                .map(|json| {
                    numeric_map(&json)
                        .into_iter()
                        .filter_map(|(key, amount)| Some((key, amount?)))
                        .collect()
                })
                .unwrap_or_default();

            recipes.push(Recipe {
                id: row.recipe_id,
                category,
                subcategory: row.kind2,
                nutrients,
                ingredients,
            });
        }

        let unit_weights = entities::ItemWeight::find()
            .all(db)
            .await?
            .into_iter()
            .map(|row| (row.item_name, unit_weight_list(&row.weights)))
            .collect();

        let equivalences = entities::ItemEqual::find()
            .all(db)
            .await?
            .into_iter()
            .flat_map(|row| {
                let canonical = row.item_name;
                row.equals
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|equal| Equivalence {
                        canonical: canonical.clone(),
                        equal: equal.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let snapshot = Self::new(recipes, unit_weights, equivalences);
        info!(
            "Reference snapshot loaded: {} recipes, {} active ingredients, {} unit weights, {} equivalences.",
            snapshot.recipes.len(),
            snapshot.active_ingredients().len(),
            snapshot.unit_weights.len(),
            snapshot.equivalences.len()
        );
        Ok(snapshot)
    }

    /// All recipes ordered by id.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Looks up one recipe.
    #[must_use]
    pub fn recipe(&self, id: i64) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    /// Canonical package unit of an ingredient, if one is declared.
    #[must_use]
    pub fn unit_weight(&self, ingredient: &str) -> Option<f64> {
        self.unit_weights
            .get(ingredient)
            .and_then(|weights| weights.first().copied())
    }

    /// Equivalence declarations in load order.
    #[must_use]
    pub fn equivalences(&self) -> &[Equivalence] {
        &self.equivalences
    }

    /// Ingredient names used with a positive quantity by at least one recipe.
    #[must_use]
    pub fn active_ingredients(&self) -> BTreeSet<String> {
        self.recipes
            .values()
            .flat_map(|r| r.ingredients.iter())
            .filter(|&(_, &grams)| grams > 0.0)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Reads a JSON object of numbers. `null` entries yield `None`; numeric
/// strings are accepted; anything else is dropped.
pub(crate) fn numeric_map(value: &Json) -> BTreeMap<String, Option<f64>> {
    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(key, v)| {
            let number = match v {
                Json::Null => None,
                Json::Number(n) => n.as_f64(),
                Json::String(s) => Some(s.trim().parse::<f64>().ok()?),
                _ => return None,
            };
            Some((key.clone(), number))
        })
        .collect()
}

fn ingredient_grams(recipe_id: i64, value: &Json) -> BTreeMap<String, f64> {
    numeric_map(value)
        .into_iter()
        .map(|(name, grams)| {
            let grams = grams.unwrap_or(0.0);
            if grams < 0.0 {
                warn!(
                    "Recipe {} lists a negative quantity for '{}', treating it as 0",
                    recipe_id, name
                );
                (name, 0.0)
            } else {
                (name, grams)
            }
        })
        .collect()
}

/// Accepts a list of numbers or a bare number. Non-positive weights are dropped
/// since they cannot define a package multiple.
fn unit_weight_list(value: &Json) -> Vec<f64> {
    let weights = match value {
        Json::Array(items) => items.iter().filter_map(Json::as_f64).collect(),
        Json::Number(n) => n.as_f64().into_iter().collect(),
        _ => Vec::new(),
    };
    weights.into_iter().filter(|w| *w > 0.0).collect()
}
