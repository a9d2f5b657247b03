use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "student_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted on create and on update (updates replace every field).
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct StudentInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub status: StudentStatus,
}

const COLUMNS: &str = "id, name, email, phone, course, status, created_at, updated_at";

impl Student {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {COLUMNS} FROM students ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &StudentInput,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (id, name, email, phone, course, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.course)
        .bind(data.status)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// `Ok(None)` when no row has this id.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &StudentInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "UPDATE students
             SET name = $2, email = $3, phone = $4, course = $5, status = $6, updated_at = $7
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.course)
        .bind(data.status)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(
        pool: &SqlitePool,
        status: StudentStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(pool)
            .await
    }
}
