//! Nutrient key vocabulary.
//!
//! Nutrition targets and recipe nutrient tables use two different naming
//! schemes. Target rows carry a nutrient prefix plus a lower/upper suffix
//! (`鉄_下限`), or a percent-of-energy figure for protein, fat and
//! carbohydrate. Recipe rows carry the nutrient name with its unit
//! (`鉄(mg)`). This table bridges the two and is loaded from `config.toml`
//! so the mapping stays data rather than logic.

use serde::Deserialize;

/// Energy key pair: the weekly kcal target and the recipe-side kcal column.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EnergyKey {
    /// Column in recipe nutrient tables (e.g. `カロリー(kcal)`)
    pub recipe_key: String,
    /// Key in nutrition target rows (e.g. `カロリー`)
    pub target_key: String,
}

/// A macronutrient whose bounds are expressed as percent of energy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MacroKey {
    /// Column in recipe nutrient tables, in grams
    pub recipe_key: String,
    /// Prefix of the `_下限`/`_上限` percent keys in target rows
    pub target_prefix: String,
    /// Physiological energy factor used for the percent-to-gram conversion
    pub kcal_per_gram: f64,
}

/// A micronutrient with direct lower/upper bounds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MicroKey {
    /// Column in recipe nutrient tables
    pub recipe_key: String,
    /// Prefix of the `_下限`/`_上限` keys in target rows
    pub target_prefix: String,
    /// Full target key replacing the lower bound for menstruating users
    #[serde(default)]
    pub menstruation_lower_key: Option<String>,
}

/// The complete key mapping table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NutrientVocabulary {
    /// Suffix marking a lower bound in target keys
    pub lower_suffix: String,
    /// Suffix marking an upper bound in target keys
    pub upper_suffix: String,
    /// Energy key pair
    pub energy: EnergyKey,
    /// Protein, fat, carbohydrate
    pub macros: Vec<MacroKey>,
    /// Micronutrients with direct bounds
    pub micros: Vec<MicroKey>,
}

impl NutrientVocabulary {
    /// Target key holding the lower bound for `prefix`.
    #[must_use]
    pub fn lower_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.lower_suffix)
    }

    /// Target key holding the upper bound for `prefix`.
    #[must_use]
    pub fn upper_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.upper_suffix)
    }

    /// Recipe-side keys that are constrained, in a stable order.
    ///
    /// Energy and PFC keys come first and are left out when `use_pfc` is false.
    #[must_use]
    pub fn recipe_keys(&self, use_pfc: bool) -> Vec<&str> {
        let mut keys = Vec::new();
        if use_pfc {
            keys.push(self.energy.recipe_key.as_str());
            keys.extend(self.macros.iter().map(|m| m.recipe_key.as_str()));
        }
        keys.extend(self.micros.iter().map(|m| m.recipe_key.as_str()));
        keys
    }
}

fn micro(recipe_key: &str, target_prefix: &str) -> MicroKey {
    MicroKey {
        recipe_key: recipe_key.to_string(),
        target_prefix: target_prefix.to_string(),
        menstruation_lower_key: None,
    }
}

impl Default for NutrientVocabulary {
    fn default() -> Self {
        let macro_key = |recipe_key: &str, target_prefix: &str, kcal_per_gram: f64| MacroKey {
            recipe_key: recipe_key.to_string(),
            target_prefix: target_prefix.to_string(),
            kcal_per_gram,
        };

        Self {
            lower_suffix: "_下限".to_string(),
            upper_suffix: "_上限".to_string(),
            energy: EnergyKey {
                recipe_key: "カロリー(kcal)".to_string(),
                target_key: "カロリー".to_string(),
            },
            macros: vec![
                macro_key("たんぱく質(g)", "たんぱく質", 4.0),
                macro_key("脂質(g)", "脂質", 9.0),
                macro_key("炭水化物(g)", "炭水化物", 4.0),
            ],
            micros: vec![
                micro("食物繊維(g)", "食物繊維"),
                micro("カルシウム(mg)", "カルシウム"),
                micro("ビタミンA(μg)", "ビタミンA"),
                micro("ビタミンD(μg)", "ビタミンD"),
                micro("ビタミンC(mg)", "ビタミンC"),
                micro("ビタミンB₁(mg)", "ビタミンB1"),
                micro("ビタミンB₂(mg)", "ビタミンB2"),
                MicroKey {
                    menstruation_lower_key: Some("鉄・月経時_下限".to_string()),
                    ..micro("鉄(mg)", "鉄")
                },
            ],
        }
    }
}
