//! Package unit weights per ingredient.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient weight database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_weights")]
pub struct Model {
    /// Ingredient name
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_name: String,
    /// JSON list of candidate unit weights in grams, canonical unit first.
    /// A bare number is accepted as a one-element list.
    pub weights: Json,
}

/// `ItemWeight` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
