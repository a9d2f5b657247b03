use std::str::FromStr;

use sqlx::{
    Error, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: SqlitePool,
}

impl DBService {
    /// Open (creating if needed) the database at `database_url` and run migrations.
    pub async fn new(database_url: &str) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        info!(database_url, "database ready");
        Ok(DBService { pool })
    }

    /// Private in-memory database. A single long-lived connection, since every
    /// new SQLite memory connection would start out empty.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        Ok(DBService { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), Error> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }
}
