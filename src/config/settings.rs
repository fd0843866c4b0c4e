//! Application settings loading from config.toml
//!
//! Every tunable constant of the worker and the model builder lives here:
//! polling cadence, solver budgets, tolerance ratios, big-M constants per
//! variable family, objective weights, cohort rules and the nutrient key
//! vocabulary. All fields default to the production values, so an empty or
//! missing config file yields a working configuration.

use crate::config::nutrients::NutrientVocabulary;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Polling loop settings
    pub worker: WorkerConfig,
    /// External solver settings
    pub solver: SolverConfig,
    /// Constraint model constants
    pub model: ModelConfig,
    /// Cohort lookup rules
    pub cohorts: CohortRules,
    /// Nutrient key mapping table
    pub nutrients: NutrientVocabulary,
}

/// Polling loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Seconds to sleep between two polls of the job table
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

/// External solver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Path to the CBC executable
    pub cbc_path: String,
    /// Wall-clock budget handed to the solver
    pub time_limit_secs: u64,
    /// Relative optimality gap at which the solver may stop
    pub relative_gap: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cbc_path: "cbc".to_string(),
            time_limit_secs: 20,
            relative_gap: 0.02,
        }
    }
}

/// A lower/upper multiplier pair.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Band {
    /// Multiplier applied to lower bounds
    pub lower: f64,
    /// Multiplier applied to upper bounds
    pub upper: f64,
}

/// Big-M constants, one per linkage family.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct BigM {
    /// Links weekly ingredient usage to the diversity indicator.
    /// Must exceed any feasible weekly total in grams.
    pub diversity: f64,
    /// Links weekly usage of a registered ingredient to its indicator.
    pub registered: f64,
}

/// Objective weights.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ObjectiveWeights {
    /// Cost per distinct ingredient class used
    pub ingredient: f64,
    /// Reward per registered ingredient used
    pub registered: f64,
    /// Penalty per registered ingredient left unused
    pub unused_registered: f64,
    /// Cost per gram of deviation from a package multiple
    pub package_multiple: f64,
}

/// Extra member forced into an equivalence class whose canonical name exists.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EquivalenceBridge {
    /// Canonical name identifying the class
    pub canonical: String,
    /// Name added to that class
    pub member: String,
}

/// Constraint model constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Solver tolerance applied to nutrient bounds
    pub tolerance: Band,
    /// Band around the energy target
    pub energy_band: Band,
    /// Big-M constants
    pub big_m: BigM,
    /// Objective weights
    pub weights: ObjectiveWeights,
    /// Staple subcategories that also fill the main slot
    pub special_staple_kinds: Vec<String>,
    /// Subcategory of plain rice recipes
    pub rice_kind: String,
    /// Weekly cap for special-staple and rice recipes
    pub repeatable_max_uses: u32,
    /// Weekly cap for every other recipe
    pub ordinary_max_uses: u32,
    /// Fewest recipes per day
    pub min_items_per_day: u32,
    /// Most recipes per day
    pub max_items_per_day: u32,
    /// Dataset bridges between equivalence classes and recipe names
    pub equivalence_bridges: Vec<EquivalenceBridge>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tolerance: Band {
                lower: 0.95,
                upper: 1.05,
            },
            energy_band: Band {
                lower: 0.9,
                upper: 1.1,
            },
            big_m: BigM {
                diversity: 1e6,
                registered: 1000.0,
            },
            weights: ObjectiveWeights {
                ingredient: 5.0,
                registered: 5.0,
                unused_registered: 15.0,
                package_multiple: 20.0,
            },
            special_staple_kinds: ["ご飯もの", "パスタ", "カレー", "鍋"]
                .into_iter()
                .map(String::from)
                .collect(),
            rice_kind: "ご飯".to_string(),
            repeatable_max_uses: 7,
            ordinary_max_uses: 1,
            min_items_per_day: 3,
            max_items_per_day: 4,
            equivalence_bridges: vec![EquivalenceBridge {
                canonical: "白米".to_string(),
                member: "米".to_string(),
            }],
        }
    }
}

/// An (age band, sex, activity level) triple identifying a nutrition target.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
pub struct Cohort {
    /// Age band label, e.g. `18~29(歳)`
    pub age_band: String,
    /// Sex label
    pub sex: String,
    /// Activity level label
    pub activity_level: String,
}

/// Rewrites the activity level used for the target lookup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ActivityOverride {
    /// Applies when the age band contains this marker
    pub age_contains: String,
    /// Applies when the user has this activity level
    pub activity_level: String,
    /// Activity level used for the lookup instead
    pub replacement: String,
}

/// Cohort lookup rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CohortRules {
    /// Cohorts for which energy and PFC constraints are dropped
    pub no_pfc: Vec<Cohort>,
    /// Activity overrides applied before the target lookup
    pub activity_overrides: Vec<ActivityOverride>,
}

impl Default for CohortRules {
    fn default() -> Self {
        let high_activity_male = |age_band: &str| Cohort {
            age_band: age_band.to_string(),
            sex: "男性".to_string(),
            activity_level: "高い".to_string(),
        };

        Self {
            no_pfc: vec![
                high_activity_male("18~29(歳)"),
                high_activity_male("30~49(歳)"),
                high_activity_male("50~64(歳)"),
            ],
            activity_overrides: vec![ActivityOverride {
                age_contains: "75".to_string(),
                activity_level: "高い".to_string(),
                replacement: "ふつう".to_string(),
            }],
        }
    }
}

/// Loads application settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `CONFIG_PATH` (default `./config.toml`).
///
/// A missing file is not an error: the built-in defaults are used instead.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        info!("No config file at {}, using built-in defaults.", path);
        return Ok(AppConfig::default());
    }
    let config = load_config(&path)?;
    info!("Loaded configuration from {}.", path);
    Ok(config)
}
