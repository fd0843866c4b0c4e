//! Framework-agnostic menu planning logic.
//!
//! Reference data is read once into a [`snapshot::ReferenceSnapshot`]; each job
//! builds a [`builder::MenuModel`] from it, hands the program to a
//! [`solver::Solver`] and stores the extracted [`menu::WeeklyMenu`].

/// MILP model construction for one weekly menu
pub mod builder;
/// Failure categories for logs and stored job errors
pub mod classify;
/// Ingredient equivalence classes
pub mod equivalence;
/// The `menu_job` queue and its status transitions
pub mod job;
/// Weekly menu extraction and storage
pub mod menu;
/// Solver-independent linear program representation
pub mod program;
/// Shopping list and nutrition reports
pub mod report;
/// Read-only reference data snapshot
pub mod snapshot;
/// Solver trait and the CBC backend
pub mod solver;
/// User profiles and nutrition targets
pub mod target;
/// The polling job worker
pub mod worker;

/// Days of the planned week.
pub const DAYS: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];
