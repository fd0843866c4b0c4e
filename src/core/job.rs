//! Menu job queue.
//!
//! Jobs live in the `menu_jobs` table and move through
//! `pending` → `running` → `done` | `failed`. Each transition is checked
//! against the status currently stored, so a job never moves backwards.

use crate::{
    core::snapshot::numeric_map,
    entities::{Menu, MenuJob, MenuJobModel, menu, menu_job},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Lifecycle state of a menu job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Queued, not yet picked up
    Pending,
    /// Being solved
    Running,
    /// Menu stored
    Done,
    /// Gave up; `error_message` holds the category
    Failed,
}

impl JobStatus {
    /// Value stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Queues a new menu request for `user_name`.
///
/// Within one transaction the user's stored menu and any pending or running
/// job are deleted, then a fresh pending job is inserted. A user therefore
/// never has more than one unfinished job.
///
/// # Arguments
/// * `db` - Database connection
/// * `user_name` - Requesting user
/// * `registered_items` - Ingredient names the user wants used, with quantities
///
/// # Returns
/// The inserted job
#[instrument(skip(db, registered_items))]
pub async fn enqueue_menu_request(
    db: &DatabaseConnection,
    user_name: &str,
    registered_items: &BTreeMap<String, f64>,
) -> Result<MenuJobModel> {
    let txn = db.begin().await?;

    let menus = Menu::delete_many()
        .filter(menu::Column::UserName.eq(user_name))
        .exec(&txn)
        .await?;
    let jobs = MenuJob::delete_many()
        .filter(menu_job::Column::UserName.eq(user_name))
        .filter(
            menu_job::Column::Status
                .is_in([JobStatus::Pending.as_str(), JobStatus::Running.as_str()]),
        )
        .exec(&txn)
        .await?;

    let now = Utc::now();
    let job = menu_job::ActiveModel {
        user_name: Set(user_name.to_string()),
        status: Set(JobStatus::Pending.as_str().to_string()),
        regist_item: Set(serde_json::to_value(registered_items)?),
        result_json: Set(None),
        error_message: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        "Queued menu job {} for {} (replaced {} menu(s), {} unfinished job(s))",
        job.id, user_name, menus.rows_affected, jobs.rows_affected
    );
    Ok(job)
}

/// All pending jobs, oldest first.
pub async fn pending_jobs(db: &DatabaseConnection) -> Result<Vec<MenuJobModel>> {
    Ok(MenuJob::find()
        .filter(menu_job::Column::Status.eq(JobStatus::Pending.as_str()))
        .order_by_asc(menu_job::Column::CreatedAt)
        .order_by_asc(menu_job::Column::Id)
        .all(db)
        .await?)
}

/// Loads one job.
pub async fn get_job(db: &DatabaseConnection, job_id: i64) -> Result<MenuJobModel> {
    MenuJob::find_by_id(job_id)
        .one(db)
        .await?
        .ok_or(Error::JobNotFound { job_id })
}

/// Parses the stored status of a job.
pub fn job_status(job: &MenuJobModel) -> Result<JobStatus> {
    job.status.parse().map_err(|_| Error::InvalidTransition {
        job_id: job.id,
        from: job.status.clone(),
        to: job.status.clone(),
    })
}

/// Registered ingredient quantities carried by a job.
///
/// Accepts an object of quantities or a plain list of names; entries
/// without a usable quantity count as 0.
#[must_use]
pub fn registered_items(job: &MenuJobModel) -> BTreeMap<String, f64> {
    match &job.regist_item {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(|name| (name.to_string(), 0.0))
            .collect(),
        other => numeric_map(other)
            .into_iter()
            .map(|(name, quantity)| (name, quantity.unwrap_or(0.0)))
            .collect(),
    }
}

async fn transition(
    db: &DatabaseConnection,
    job_id: i64,
    allowed_from: &[JobStatus],
    to: JobStatus,
    apply: impl FnOnce(&mut menu_job::ActiveModel),
) -> Result<MenuJobModel> {
    let job = get_job(db, job_id).await?;
    let from = job_status(&job)?;
    if !allowed_from.contains(&from) {
        return Err(Error::InvalidTransition {
            job_id,
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let mut active: menu_job::ActiveModel = job.into();
    active.status = Set(to.as_str().to_string());
    active.updated_at = Set(Utc::now());
    apply(&mut active);
    let updated = active.update(db).await?;
    debug!("Job {} moved from {} to {}", job_id, from, to);
    Ok(updated)
}

/// `pending` → `running`
pub async fn mark_running(db: &DatabaseConnection, job_id: i64) -> Result<MenuJobModel> {
    transition(db, job_id, &[JobStatus::Pending], JobStatus::Running, |_| {}).await
}

/// `running` → `done`, storing the extracted menu.
pub async fn mark_done(
    db: &DatabaseConnection,
    job_id: i64,
    result: Value,
) -> Result<MenuJobModel> {
    transition(db, job_id, &[JobStatus::Running], JobStatus::Done, |job| {
        job.result_json = Set(Some(result));
        job.error_message = Set(None);
    })
    .await
}

/// `pending` | `running` → `failed`, storing the failure category.
pub async fn mark_failed(
    db: &DatabaseConnection,
    job_id: i64,
    error_message: &str,
) -> Result<MenuJobModel> {
    transition(
        db,
        job_id,
        &[JobStatus::Pending, JobStatus::Running],
        JobStatus::Failed,
        |job| job.error_message = Set(Some(error_message.to_string())),
    )
    .await
}

/// Most recently queued job of a user.
pub async fn latest_job_for_user(
    db: &DatabaseConnection,
    user_name: &str,
) -> Result<Option<MenuJobModel>> {
    Ok(MenuJob::find()
        .filter(menu_job::Column::UserName.eq(user_name))
        .order_by_desc(menu_job::Column::CreatedAt)
        .order_by_desc(menu_job::Column::Id)
        .one(db)
        .await?)
}

/// What a client polling for its menu should be told.
///
/// `done` whenever a menu is stored, otherwise the status of the latest job,
/// or `pending` when the user never queued anything.
pub async fn menu_status(db: &DatabaseConnection, user_name: &str) -> Result<JobStatus> {
    let has_menu = Menu::find()
        .filter(menu::Column::UserName.eq(user_name))
        .one(db)
        .await?
        .is_some();
    if has_menu {
        return Ok(JobStatus::Done);
    }

    match latest_job_for_user(db, user_name).await? {
        Some(job) => job_status(&job),
        None => Ok(JobStatus::Pending),
    }
}
