//! Unified error type for the menu planner.

use thiserror::Error;

/// Every failure the worker, the job queue and the model builder can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Any failure raised by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or process I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// The job references a user that does not exist
    #[error("User '{user_name}' not found")]
    UserNotFound {
        /// Name carried by the job
        user_name: String,
    },

    /// No nutrition target row matches the user's cohort
    #[error("No nutrition target for age '{age_band}', sex '{sex}', activity '{activity_level}'")]
    TargetNotFound {
        /// Age band used for the lookup
        age_band: String,
        /// Sex used for the lookup
        sex: String,
        /// Activity level used for the lookup (after overrides)
        activity_level: String,
    },

    /// A recipe row violates the reference data invariants
    #[error("Invalid recipe {recipe_id}: {reason}")]
    InvalidRecipe {
        /// Offending recipe
        recipe_id: i64,
        /// Why it was rejected
        reason: String,
    },

    /// The job row disappeared or never existed
    #[error("Job {job_id} not found")]
    JobNotFound {
        /// Job primary key
        job_id: i64,
    },

    /// A status update would move a job backwards or skip a state
    #[error("Job {job_id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        /// Job primary key
        job_id: i64,
        /// Status found in the table
        from: String,
        /// Status requested
        to: String,
    },

    /// The external solver could not be run or its output could not be read
    #[error("Solver error: {message}")]
    Solver {
        /// Diagnostic text
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
