use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "feedback_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackCategory {
    Bug,
    Suggestion,
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: FeedbackCategory,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct FeedbackInput {
    pub category: FeedbackCategory,
    pub message: String,
}

impl Feedback {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &FeedbackInput,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(
            "INSERT INTO feedback (id, user_id, category, message, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, category, message, created_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(data.category)
        .bind(&data.message)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(
            "SELECT id, user_id, category, message, created_at
             FROM feedback ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
