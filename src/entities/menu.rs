//! Menu entity - the persisted weekly menu, one row per user.
//!
//! Each `menuN` column is a JSON object mapping meal category to recipe id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Weekly menu database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the menu
    #[sea_orm(unique, column_name = "userName")]
    pub user_name: String,
    /// Day 1
    pub menu1: Json,
    /// Day 2
    pub menu2: Json,
    /// Day 3
    pub menu3: Json,
    /// Day 4
    pub menu4: Json,
    /// Day 5
    pub menu5: Json,
    /// Day 6
    pub menu6: Json,
    /// Day 7
    pub menu7: Json,
    /// When the menu was generated
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTimeUtc,
}

/// `Menu` has no declared relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
