//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    ItemEqual, ItemWeight, Menu, MenuJob, NutritionTarget, Recipe, RecipeItem, RecipeNutrition,
    User,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://menu_planner.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable,
/// falling back to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table that does not exist yet.
///
/// Reference tables (recipes, ingredient and nutrient tables, weights,
/// equivalences, targets, users) come first, followed by the job queue and
/// the menu table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Recipe).await?;
    create_table(db, &schema, RecipeItem).await?;
    create_table(db, &schema, RecipeNutrition).await?;
    create_table(db, &schema, ItemWeight).await?;
    create_table(db, &schema, ItemEqual).await?;
    create_table(db, &schema, NutritionTarget).await?;
    create_table(db, &schema, MenuJob).await?;
    create_table(db, &schema, Menu).await?;

    info!("Database tables ensured.");
    Ok(())
}
