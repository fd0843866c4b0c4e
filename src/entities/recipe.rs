//! Recipe entity - one dish and its meal category.
//!
//! `kind1` is the meal category (`staple`, `main`, `side`, `soup`) and
//! `kind2` the subcategory (rice dish, pasta, curry, hotpot, ...).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Recipe identifier, assigned by the data source
    #[sea_orm(primary_key, auto_increment = false)]
    pub recipe_id: i64,
    /// Display title
    pub title: String,
    /// Meal category
    pub kind1: String,
    /// Subcategory
    pub kind2: String,
}

/// Defines relationships between Recipe and its detail tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One recipe has one ingredient table
    #[sea_orm(has_one = "super::recipe_item::Entity")]
    RecipeItem,
    /// One recipe has one nutrient table
    #[sea_orm(has_one = "super::recipe_nutrition::Entity")]
    RecipeNutrition,
}

impl Related<super::recipe_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeItem.def()
    }
}

impl Related<super::recipe_nutrition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeNutrition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
