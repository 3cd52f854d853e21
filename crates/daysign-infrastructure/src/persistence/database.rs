use std::fs::OpenOptions;
use std::path::Path;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use daysign_domain::shared::DomainError;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_path: &str) -> Result<Self, DomainError> {
        let path = Path::new(db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::Infrastructure(format!("Failed to create DB directory: {}", e))
            })?;
        }

        if !path.exists() {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(|e| {
                    DomainError::Infrastructure(format!("Failed to create DB file: {}", e))
                })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}", db_path))
            .await
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;

        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> Result<Self, DomainError> {
        // Tests that pause the tokio clock need acquires that never wait:
        // the auto-advancing clock fires the pool's acquire timeout the
        // moment the runtime parks on the sqlite worker thread. Two warm
        // connections (a plain `:memory:` database would give each
        // connection its own database, hence the shared-cache URI with a
        // unique name per pool) plus no acquire-time ping keep every
        // acquire synchronous. Idle/lifetime reaping is disabled for the
        // same reason: the paused clock would fast-forward to the reaper's
        // deadline and close every idle connection mid-test.
        static NEXT_DB_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let db_id = NEXT_DB_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .idle_timeout(None)
            .max_lifetime(None)
            .test_before_acquire(false)
            .connect(&format!(
                "sqlite:file:daysign_inmem_{}?mode=memory&cache=shared",
                db_id
            ))
            .await
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;

        let warm_a = pool
            .acquire()
            .await
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;
        let warm_b = pool
            .acquire()
            .await
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;
        drop(warm_a);
        drop(warm_b);

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
