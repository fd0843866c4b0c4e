//! Recipe ingredient table - grams of each ingredient used by a recipe.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_items")]
pub struct Model {
    /// Recipe this table belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub recipe_id: i64,
    /// JSON object mapping ingredient name to grams; `null` means 0
    pub items: Json,
}

/// Defines relationships between the ingredient table and its recipe
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each table belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::RecipeId"
    )]
    Recipe,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
