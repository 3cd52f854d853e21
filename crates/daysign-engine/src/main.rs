use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use daysign_engine::Engine;
use daysign_infrastructure::config::EngineConfig;
use daysign_infrastructure::http::HttpCheckinClient;
use daysign_infrastructure::logging::init_logger;
use daysign_infrastructure::persistence::repositories::{
    SqliteAccountRepository, SqliteResultLogRepository, SqliteScheduleRepository,
};
use daysign_infrastructure::persistence::Database;

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DAYSIGN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daysign")
}

#[tokio::main]
async fn main() -> Result<()> {
    let data_dir = data_dir();
    init_logger(data_dir.join("logs")).context("Failed to initialize logger")?;

    let config = EngineConfig::default();

    let db_path = data_dir.join("daysign.db");
    let database = Database::new(&db_path.to_string_lossy())
        .await
        .context("Failed to open database")?;
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    let pool = Arc::new(database.pool().clone());

    let client = Arc::new(
        HttpCheckinClient::new(config.request_timeout)
            .context("Failed to create check-in client")?,
    );

    let engine = Engine::new(
        config,
        client,
        Arc::new(SqliteAccountRepository::new(Arc::clone(&pool))),
        Arc::new(SqliteScheduleRepository::new(Arc::clone(&pool))),
        Arc::new(SqliteResultLogRepository::new(Arc::clone(&pool))),
    );

    engine.start().await;
    info!("daysign running, data dir: {}", data_dir.display());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    engine.shutdown().await;
    Ok(())
}
