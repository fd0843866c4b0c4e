//! Ingredient equivalence declarations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient equivalence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_equals")]
pub struct Model {
    /// Canonical ingredient name
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_name: String,
    /// Interchangeable name; several names may be separated by commas
    pub equals: String,
}

/// `ItemEqual` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
