use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "staff_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct StaffMember {
    pub id: Uuid,
    pub user_id: Option<Uuid>, // Login account, when the member can sign in
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department_id: Option<Uuid>,
    pub salary: Option<f64>,
    pub status: StaffStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct StaffInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department_id: Option<Uuid>,
    pub salary: Option<f64>,
    pub status: StaffStatus,
}

const COLUMNS: &str = "id, user_id, name, email, phone, position, department_id, salary, status, created_at, updated_at";

impl StaffMember {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StaffMember>(&format!(
            "SELECT {COLUMNS} FROM staff ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, StaffMember>(&format!("SELECT {COLUMNS} FROM staff WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &StaffInput,
        user_id: Option<Uuid>,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, StaffMember>(&format!(
            "INSERT INTO staff (id, user_id, name, email, phone, position, department_id, salary, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.position)
        .bind(data.department_id)
        .bind(data.salary)
        .bind(data.status)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &StaffInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, StaffMember>(&format!(
            "UPDATE staff
             SET name = $2, email = $3, phone = $4, position = $5, department_id = $6,
                 salary = $7, status = $8, updated_at = $9
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.position)
        .bind(data.department_id)
        .bind(data.salary)
        .bind(data.status)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(pool: &SqlitePool, status: StaffStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staff WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staff")
            .fetch_one(pool)
            .await
    }

    /// Monthly salary cost of active staff.
    pub async fn active_salary_total(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(salary), 0.0) FROM staff WHERE status = 'active' AND salary IS NOT NULL",
        )
        .fetch_one(pool)
        .await
    }
}
