//! Entity module - Contains all SeaORM entity definitions for the database.
//! Reference data (recipes, ingredient tables, weights, equivalences, targets,
//! users) is read by the worker; jobs and menus are written by it.

pub mod item_equal;
pub mod item_weight;
pub mod menu;
pub mod menu_job;
pub mod nutrition_target;
pub mod recipe;
pub mod recipe_item;
pub mod recipe_nutrition;
pub mod user;

// Re-export specific types to avoid conflicts
pub use item_equal::{Entity as ItemEqual, Model as ItemEqualModel};
pub use item_weight::{Entity as ItemWeight, Model as ItemWeightModel};
pub use menu::{Column as MenuColumn, Entity as Menu, Model as MenuModel};
pub use menu_job::{Column as MenuJobColumn, Entity as MenuJob, Model as MenuJobModel};
pub use nutrition_target::{
    Column as NutritionTargetColumn, Entity as NutritionTarget, Model as NutritionTargetModel,
};
pub use recipe::{Entity as Recipe, Model as RecipeModel};
pub use recipe_item::{Entity as RecipeItem, Model as RecipeItemModel};
pub use recipe_nutrition::{Entity as RecipeNutrition, Model as RecipeNutritionModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
