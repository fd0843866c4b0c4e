//! Nutrition target entity - nutrient bounds for one cohort.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Nutrition target database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nutrition_targets")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Age band label
    pub age_band: String,
    /// Sex label
    pub sex: String,
    /// Activity level label
    pub activity_level: String,
    /// JSON object keyed by target-side nutrient names (`鉄_下限`, `カロリー`, ...)
    pub nutrients: Json,
}

/// `NutritionTarget` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
