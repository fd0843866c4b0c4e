//! Solve-job worker.
//!
//! A single worker polls the job table, and for every pending job resolves
//! the user's target, builds the weekly model, runs the solver and stores the
//! extracted menu. Jobs are processed one at a time in creation order.
//!
//! Solver trouble is not fatal: when the solver fails or stops early the menu
//! is still extracted from whatever values are available. A job only fails
//! when its profile is missing or a database step fails.

use crate::{
    config::AppConfig,
    core::{
        builder::{MenuModel, ModelInput, build_model},
        classify::{ErrorCategory, classify},
        equivalence::EquivalenceResolver,
        job::{mark_done, mark_failed, mark_running, pending_jobs, registered_items},
        menu::{WeeklyMenu, extract_weekly_menu, save_menu},
        snapshot::ReferenceSnapshot,
        solver::{SolveOptions, Solution, Solver, TerminationCondition},
        target::{NutritionTarget, find_nutrition_target, find_user, lookup_cohort, uses_pfc},
    },
    entities::MenuJobModel,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Largest number of violated constraints written to the log per job.
const MAX_LOGGED_VIOLATIONS: usize = 20;

/// Absolute slack when checking a solver assignment against the model.
const VIOLATION_TOLERANCE: f64 = 1e-6;

/// How one job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The menu was stored and the job marked `done`
    Done(WeeklyMenu),
    /// The job was marked `failed` with this category
    Failed(ErrorCategory),
}

/// What happened while a job was processed, for the per-job log event.
#[derive(Debug, Default)]
struct Attempt {
    termination: Option<TerminationCondition>,
    solver_duration: Option<Duration>,
    db_duration: Option<Duration>,
    week: Option<WeeklyMenu>,
}

/// Polls for pending menu jobs and solves them.
pub struct Worker<S> {
    db: DatabaseConnection,
    snapshot: ReferenceSnapshot,
    resolver: EquivalenceResolver,
    solver: S,
    config: AppConfig,
}

impl<S: Solver> Worker<S> {
    /// Creates a worker over an already loaded snapshot.
    pub fn new(
        db: DatabaseConnection,
        snapshot: ReferenceSnapshot,
        solver: S,
        config: AppConfig,
    ) -> Self {
        let resolver = EquivalenceResolver::new(
            snapshot.equivalences(),
            &config.model.equivalence_bridges,
            &snapshot.active_ingredients(),
        );
        Self {
            db,
            snapshot,
            resolver,
            solver,
            config,
        }
    }

    /// Polls until `shutdown` completes.
    ///
    /// Errors while polling are logged and the loop continues after the
    /// usual sleep. A job that is being processed when shutdown is requested
    /// is finished first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let interval = Duration::from_secs(self.config.worker.poll_interval_secs);
        tokio::pin!(shutdown);
        info!("Worker started, polling every {:?}.", interval);

        loop {
            match self.run_once().await {
                Ok(0) => debug!("No pending jobs"),
                Ok(processed) => info!("Processed {} job(s)", processed),
                Err(e) => error!("Worker loop error: {}", e),
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, worker stopping.");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Processes every job pending right now, oldest first.
    ///
    /// # Returns
    /// The number of jobs processed
    pub async fn run_once(&self) -> Result<usize> {
        let jobs = pending_jobs(&self.db).await?;
        for job in &jobs {
            self.process_job(job).await;
        }
        Ok(jobs.len())
    }

    /// Runs one job to a terminal state.
    #[instrument(skip(self, job), fields(job_id = job.id, user = %job.user_name))]
    pub async fn process_job(&self, job: &MenuJobModel) -> JobOutcome {
        let mut attempt = Attempt::default();
        let result = self.attempt(job, &mut attempt).await;
        let solver_secs = attempt.solver_duration.map(|d| d.as_secs_f64());
        let db_secs = attempt.db_duration.map(|d| d.as_secs_f64());
        let day_menus = attempt.week.as_ref().map(WeeklyMenu::to_json);

        match result {
            Ok(week) => {
                info!(
                    user = %job.user_name,
                    status = "success",
                    solver_duration = ?solver_secs,
                    db_duration = ?db_secs,
                    day_menus = ?day_menus,
                    regist_item = %job.regist_item,
                    "Menu job {} done",
                    job.id
                );
                JobOutcome::Done(week)
            }
            Err(e) => {
                let category = classify(Some(&e), attempt.termination);
                error!(
                    user = %job.user_name,
                    status = "failure",
                    solver_duration = ?solver_secs,
                    db_duration = ?db_secs,
                    day_menus = ?day_menus,
                    regist_item = %job.regist_item,
                    error_type = category.code(),
                    error_trace = %e,
                    "Menu job {} failed: {}",
                    job.id,
                    category
                );
                if let Err(mark_err) = mark_failed(&self.db, job.id, category.message()).await {
                    error!("Could not mark job {} as failed: {}", job.id, mark_err);
                }
                JobOutcome::Failed(category)
            }
        }
    }

    async fn attempt(&self, job: &MenuJobModel, attempt: &mut Attempt) -> Result<WeeklyMenu> {
        mark_running(&self.db, job.id).await?;

        let user = find_user(&self.db, &job.user_name)
            .await?
            .ok_or_else(|| Error::UserNotFound {
                user_name: job.user_name.clone(),
            })?;
        let rules = &self.config.cohorts;
        let cohort = lookup_cohort(&user.cohort, rules);
        let target = find_nutrition_target(&self.db, &cohort)
            .await?
            .ok_or_else(|| Error::TargetNotFound {
                age_band: cohort.age_band.clone(),
                sex: cohort.sex.clone(),
                activity_level: cohort.activity_level.clone(),
            })?;

        let registered = registered_items(job);
        let model = self.build(&target, user.menstruation, uses_pfc(&user.cohort, rules), &registered);

        let started = Instant::now();
        let solution = self.solve(&model).await;
        attempt.solver_duration = Some(started.elapsed());
        attempt.termination = solution.as_ref().map(|s| s.termination);

        let week = extract_weekly_menu(&model, solution.as_ref());
        attempt.week = Some(week.clone());

        let started = Instant::now();
        save_menu(&self.db, &job.user_name, &week).await?;
        mark_done(&self.db, job.id, week.to_json()).await?;
        attempt.db_duration = Some(started.elapsed());

        Ok(week)
    }

    fn build(
        &self,
        target: &NutritionTarget,
        menstruation: bool,
        use_pfc: bool,
        registered: &BTreeMap<String, f64>,
    ) -> MenuModel {
        let input = ModelInput {
            snapshot: &self.snapshot,
            resolver: &self.resolver,
            target,
            menstruation,
            use_pfc,
            registered_items: registered,
        };
        build_model(&input, &self.config.model, &self.config.nutrients)
    }

    /// Solves the model, degrading failures to "no assignment".
    async fn solve(&self, model: &MenuModel) -> Option<Solution> {
        let options = SolveOptions::from(&self.config.solver);
        match self.solver.solve(&model.program, &options).await {
            Ok(solution) => {
                if solution.termination == TerminationCondition::Optimal {
                    info!("Solver finished: {:?}", solution.objective);
                } else {
                    warn!("Solver stopped with status {}", solution.termination);
                    log_violations(model, &solution);
                }
                Some(solution)
            }
            Err(e) => {
                error!("Solver failed: {}", e);
                warn!("Model at failure: {}", model.summary());
                warn!("No assignment available; the menu will be empty");
                None
            }
        }
    }
}

fn log_violations(model: &MenuModel, solution: &Solution) {
    let violations = model
        .program
        .violations(solution.values(), VIOLATION_TOLERANCE);
    if violations.is_empty() {
        return;
    }
    warn!("{} constraint(s) violated by the returned assignment", violations.len());
    for v in violations.iter().take(MAX_LOGGED_VIOLATIONS) {
        warn!(
            "  {}: {} not in [{:?}, {:?}]",
            v.name, v.activity, v.lower, v.upper
        );
    }
}
