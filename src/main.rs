use menu_planner::{
    config::{self, database},
    core::{snapshot::ReferenceSnapshot, solver::CbcSolver, worker::Worker},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (DATABASE_URL, CONFIG_PATH, RUST_LOG)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Read the reference tables once; jobs never reload them
    let snapshot = ReferenceSnapshot::load(&db)
        .await
        .inspect_err(|e| error!("Failed to load reference data: {}", e))?;

    // 6. Serve jobs until Ctrl-C
    let solver = CbcSolver::from_config(&app_config.solver);
    let worker = Worker::new(db, snapshot, solver, app_config);
    worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", e);
            }
        })
        .await;

    info!("Worker stopped.");
    Ok(())
}
