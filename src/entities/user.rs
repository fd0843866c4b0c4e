//! User entity - a registered person whose cohort selects a nutrition target.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, also the key used by jobs and menus
    #[sea_orm(unique)]
    pub user_name: String,
    /// Age band label, e.g. `18~29(歳)`
    pub age_band: String,
    /// Sex label
    pub sex: String,
    /// Activity level label
    pub activity_level: String,
    /// Whether the iron target should use the menstruating-cohort lower bound
    pub menstruation: bool,
}

/// `User` has no declared relations; jobs and menus reference it by name
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
