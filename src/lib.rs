pub mod config;
pub mod db;
pub mod models;

use std::path::Path;

use tracing_subscriber::EnvFilter;

use db::{ConsistencyReport, DatabaseError};

/// Failure of the binary entry point.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Install the global tracing subscriber (`RUST_LOG` wins over the default filter).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open (creating if needed) the database at `path`, bring the schema up to
/// date and run the consistency check.
pub fn initialize(path: &Path) -> Result<ConsistencyReport, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = db::open_database(path)?;
    let version = db::schema_version(&conn)?;
    let tables = db::count_tables(&conn)?;
    tracing::info!(path = %path.display(), version, tables, "Database ready");

    db::check_consistency(&conn)
}

/// Binary entry: set up logging, initialize the configured database and
/// print the consistency report as JSON.
pub fn run() -> Result<(), RunError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let report = initialize(&config::database_path())?;
    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    Ok(())
}
