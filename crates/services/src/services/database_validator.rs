//! Startup check that the schema the handlers rely on is present.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables every data service operation touches.
pub const REQUIRED_TABLES: &[&str] = &[
    "user_accounts",
    "departments",
    "students",
    "staff",
    "financial_transactions",
    "feedback",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let missing = self.missing_tables(REQUIRED_TABLES).await?;
        if !missing.is_empty() {
            warn!(?missing, "schema incomplete");
            return Err(DatabaseValidationError::MissingTables(missing));
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        info!(migrations_applied, ?latest_migration, "database validation complete");
        Ok(ValidationResult {
            migrations_applied: migrations_applied as usize,
            latest_migration,
        })
    }

    pub async fn missing_tables(&self, required: &[&str]) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing = Vec::new();
        for table in required {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?
                > 0;
            if !exists {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        format!("Database OK - {} migrations applied", self.migrations_applied)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn migrated_database_passes() {
        let db = DBService::new_in_memory().await.unwrap();
        let result = DatabaseValidator::new(db.pool.clone()).validate().await.unwrap();
        assert_eq!(result.migrations_applied, 1);
        assert_eq!(result.latest_migration.as_deref(), Some("init"));
    }

    #[tokio::test]
    async fn dropped_table_is_reported() {
        let db = DBService::new_in_memory().await.unwrap();
        sqlx::query("DROP TABLE feedback").execute(&db.pool).await.unwrap();
        let err = DatabaseValidator::new(db.pool.clone()).validate().await.unwrap_err();
        assert!(matches!(err, DatabaseValidationError::MissingTables(t) if t == ["feedback"]));
    }
}
