/// Database configuration and connection management
pub mod database;

/// Nutrient key vocabulary bridging target and recipe naming schemes
pub mod nutrients;

/// Application settings loading from config.toml
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
