use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionType {
    Revenue,
    Expense,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: String,
    pub amount: f64,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with its sign in the balance: revenue adds, expense subtracts.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Revenue => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: String,
    pub amount: f64,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

/// Sum of amounts for one (type, category) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct CategoryTotal {
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: String,
    pub total: f64,
    pub count: i64,
}

const COLUMNS: &str =
    "id, type, category, amount, description, transaction_date, created_by, created_at";

impl Transaction {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {COLUMNS} FROM financial_transactions
             ORDER BY transaction_date DESC, created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {COLUMNS} FROM financial_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &TransactionInput,
        created_by: Option<Uuid>,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO financial_transactions
                (id, type, category, amount, description, transaction_date, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(data.transaction_type)
        .bind(&data.category)
        .bind(data.amount)
        .bind(&data.description)
        .bind(data.transaction_date)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &TransactionInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE financial_transactions
             SET type = $2, category = $3, amount = $4, description = $5, transaction_date = $6
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(data.transaction_type)
        .bind(&data.category)
        .bind(data.amount)
        .bind(&data.description)
        .bind(data.transaction_date)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM financial_transactions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Totals per type and category for `from <= transaction_date < until`.
    pub async fn totals_by_category(
        pool: &SqlitePool,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<CategoryTotal>, sqlx::Error> {
        sqlx::query_as::<_, CategoryTotal>(
            "SELECT type, category, COALESCE(SUM(amount), 0.0) AS total, COUNT(*) AS count
             FROM financial_transactions
             WHERE transaction_date >= $1 AND transaction_date < $2
             GROUP BY type, category
             ORDER BY type, total DESC",
        )
        .bind(from)
        .bind(until)
        .fetch_all(pool)
        .await
    }

    /// Revenue and expense totals over the whole ledger.
    pub async fn lifetime_totals(pool: &SqlitePool) -> Result<(f64, f64), sqlx::Error> {
        sqlx::query_as::<_, (f64, f64)>(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'revenue' THEN amount END), 0.0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount END), 0.0)
             FROM financial_transactions",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM financial_transactions")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn input(kind: TransactionType, category: &str, amount: f64, date: &str) -> TransactionInput {
        TransactionInput {
            transaction_type: kind,
            category: category.to_string(),
            amount,
            description: None,
            transaction_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    #[tokio::test]
    async fn totals_group_by_category_within_range() {
        let db = DBService::new_in_memory().await.unwrap();
        for data in [
            input(TransactionType::Revenue, "Propinas", 150.0, "2025-01-10"),
            input(TransactionType::Revenue, "Propinas", 50.0, "2025-01-20"),
            input(TransactionType::Expense, "Material", 30.0, "2025-01-15"),
            input(TransactionType::Expense, "Material", 99.0, "2025-02-01"),
        ] {
            Transaction::create(&db.pool, &data, None, Uuid::new_v4()).await.unwrap();
        }

        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let totals = Transaction::totals_by_category(&db.pool, from, until).await.unwrap();
        assert_eq!(totals.len(), 2);
        let propinas = totals.iter().find(|t| t.category == "Propinas").unwrap();
        assert_eq!(propinas.transaction_type, TransactionType::Revenue);
        assert!((propinas.total - 200.0).abs() < 1e-9);
        assert_eq!(propinas.count, 2);

        let (revenue, expense) = Transaction::lifetime_totals(&db.pool).await.unwrap();
        assert!((revenue - 200.0).abs() < 1e-9);
        assert!((expense - 129.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_positive_amount_violates_check() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = Transaction::create(
            &db.pool,
            &input(TransactionType::Expense, "Luz", 0.0, "2025-03-01"),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(err.as_database_error().unwrap().is_check_violation());
    }

    #[test]
    fn signed_amount_follows_type() {
        let t = Transaction {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Expense,
            category: "Luz".into(),
            amount: 12.5,
            description: None,
            transaction_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_by: None,
            created_at: Utc::now(),
        };
        assert_eq!(t.signed_amount(), -12.5);
    }
}
