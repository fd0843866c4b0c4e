//! Menu job entity - one queued menu-generation request.
//!
//! Status moves `pending` → `running` → `done` | `failed` and never back.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu job database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_jobs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requesting user
    #[sea_orm(column_name = "userName")]
    pub user_name: String,
    /// `pending`, `running`, `done` or `failed`
    pub status: String,
    /// JSON object mapping registered ingredient name to quantity
    pub regist_item: Json,
    /// Extracted weekly menu once the job is done
    pub result_json: Option<Json>,
    /// Classified failure category when the job failed
    pub error_message: Option<String>,
    /// When the request was queued
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

/// `MenuJob` has no declared relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
