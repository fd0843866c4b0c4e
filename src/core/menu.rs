//! Weekly menu extraction and storage.

use crate::{
    core::{
        DAYS,
        builder::MenuModel,
        snapshot::Category,
        solver::Solution,
    },
    entities::{Menu, menu},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Selection values above this count as chosen.
const SELECTED: f64 = 0.5;

/// Recipes served on one day, at most one per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayMenu {
    recipes: BTreeMap<Category, i64>,
}

impl DayMenu {
    /// Recipe served for `category`, if any.
    #[must_use]
    pub fn recipe(&self, category: Category) -> Option<i64> {
        self.recipes.get(&category).copied()
    }

    /// `(category, recipe_id)` pairs in menu order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        self.recipes.iter().map(|(c, r)| (*c, *r))
    }

    /// Number of filled categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether nothing is served.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn to_json(&self) -> Value {
        Value::Object(
            self.recipes
                .iter()
                .map(|(category, id)| (category.as_str().to_string(), Value::from(*id)))
                .collect(),
        )
    }

    fn from_json(value: &Value) -> Self {
        let mut day = Self::default();
        let Some(object) = value.as_object() else {
            return day;
        };
        for (key, id) in object {
            match (key.parse::<Category>(), id.as_i64()) {
                (Ok(category), Some(id)) => {
                    day.recipes.insert(category, id);
                }
                _ => warn!("Ignoring stored menu entry {}: {}", key, id),
            }
        }
        day
    }
}

/// Seven day menus keyed 1..=7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyMenu {
    days: BTreeMap<u8, DayMenu>,
}

impl Default for WeeklyMenu {
    fn default() -> Self {
        Self {
            days: DAYS.into_iter().map(|d| (d, DayMenu::default())).collect(),
        }
    }
}

impl WeeklyMenu {
    /// Menu of one day (1..=7).
    #[must_use]
    pub fn day(&self, day: u8) -> Option<&DayMenu> {
        self.days.get(&day)
    }

    /// Serves `recipe_id` as the day's `category`, replacing any earlier choice.
    pub fn set(&mut self, day: u8, category: Category, recipe_id: i64) {
        self.days
            .entry(day)
            .or_default()
            .recipes
            .insert(category, recipe_id);
    }

    /// `(day, day menu)` pairs in day order.
    pub fn days(&self) -> impl Iterator<Item = (u8, &DayMenu)> {
        self.days.iter().map(|(d, m)| (*d, m))
    }

    /// Every recipe served in the week, one entry per serving.
    pub fn servings(&self) -> impl Iterator<Item = i64> + '_ {
        self.days.values().flat_map(|day| day.recipes.values().copied())
    }

    /// `{"menu1": {"staple": 12, ...}, ..., "menu7": {...}}`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (day, menu) in &self.days {
            object.insert(format!("menu{day}"), menu.to_json());
        }
        Value::Object(object)
    }

    fn from_model(model: &menu::Model) -> Self {
        let columns = [
            &model.menu1,
            &model.menu2,
            &model.menu3,
            &model.menu4,
            &model.menu5,
            &model.menu6,
            &model.menu7,
        ];
        Self {
            days: DAYS
                .into_iter()
                .zip(columns)
                .map(|(day, value)| (day, DayMenu::from_json(value)))
                .collect(),
        }
    }
}

/// Reads the chosen recipes out of a solution.
///
/// With no solution every day is empty. When several recipes of the same
/// category are selected on a day, the one with the highest id wins.
#[must_use]
pub fn extract_weekly_menu(model: &MenuModel, solution: Option<&Solution>) -> WeeklyMenu {
    let mut week = WeeklyMenu::default();
    let Some(solution) = solution else {
        return week;
    };

    for day in DAYS {
        for recipe_id in model.recipe_ids() {
            let (Some(var), Some(category)) =
                (model.selection_var(day, recipe_id), model.category(recipe_id))
            else {
                continue;
            };
            if solution.value(var) > SELECTED {
                week.set(day, category, recipe_id);
            }
        }
    }
    week
}

/// Stores `week` as the user's only menu.
pub async fn save_menu(
    db: &DatabaseConnection,
    user_name: &str,
    week: &WeeklyMenu,
) -> Result<menu::Model> {
    let day = |d: u8| week.day(d).map_or_else(|| Value::Object(Map::new()), DayMenu::to_json);

    let txn = db.begin().await?;
    Menu::delete_many()
        .filter(menu::Column::UserName.eq(user_name))
        .exec(&txn)
        .await?;

    let saved = menu::ActiveModel {
        user_name: Set(user_name.to_string()),
        menu1: Set(day(1)),
        menu2: Set(day(2)),
        menu3: Set(day(3)),
        menu4: Set(day(4)),
        menu5: Set(day(5)),
        menu6: Set(day(6)),
        menu7: Set(day(7)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    debug!("Stored menu {} for {}", saved.id, user_name);
    Ok(saved)
}

/// Loads the user's stored menu.
pub async fn get_menu(db: &DatabaseConnection, user_name: &str) -> Result<Option<WeeklyMenu>> {
    let row = Menu::find()
        .filter(menu::Column::UserName.eq(user_name))
        .one(db)
        .await?;
    Ok(row.as_ref().map(WeeklyMenu::from_model))
}
