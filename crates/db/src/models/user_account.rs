use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Capability tag carried by an account and embedded in its access token.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    GlobalAdmin,
    Staff,
    Professor,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUserAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
}

const COLUMNS: &str = "id, email, password_hash, full_name, role, is_active, created_at";

impl UserAccount {
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {COLUMNS} FROM user_accounts WHERE email = $1 COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {COLUMNS} FROM user_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_with_role(pool: &SqlitePool, role: UserRole) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_accounts WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Accepts a pool or an open transaction so account creation can be
    /// grouped with other inserts.
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateUserAccount,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UserAccount>(&format!(
            "INSERT INTO user_accounts (id, email, password_hash, full_name, role, is_active, created_at)
             VALUES ($1, $2, $3, $4, $5, 1, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.full_name)
        .bind(data.role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn set_role<'e, E>(executor: E, id: Uuid, role: UserRole) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE user_accounts SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_active(pool: &SqlitePool, id: Uuid, active: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE user_accounts SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn account(email: &str, role: Option<UserRole>) -> CreateUserAccount {
        CreateUserAccount {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            role,
        }
    }

    #[tokio::test]
    async fn create_and_find_case_insensitive() {
        let db = DBService::new_in_memory().await.unwrap();
        let id = Uuid::new_v4();
        UserAccount::create(&db.pool, &account("Admin@Escola.pt", Some(UserRole::GlobalAdmin)), id)
            .await
            .unwrap();

        let found = UserAccount::find_by_email(&db.pool, "admin@escola.pt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.role, Some(UserRole::GlobalAdmin));
        assert!(found.is_active);
        assert_eq!(
            UserAccount::count_with_role(&db.pool, UserRole::GlobalAdmin).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        UserAccount::create(&db.pool, &account("x@escola.pt", None), Uuid::new_v4())
            .await
            .unwrap();
        let err = UserAccount::create(&db.pool, &account("x@escola.pt", None), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_unique_violation());
    }

    #[test]
    fn role_string_forms() {
        assert_eq!(UserRole::GlobalAdmin.to_string(), "global_admin");
        assert_eq!("staff".parse::<UserRole>().unwrap(), UserRole::Staff);
        assert!("admin".parse::<UserRole>().is_err());
    }
}
