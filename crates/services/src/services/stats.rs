//! Headline numbers for the dashboard and the recommendations prompt.

use db::models::{
    staff::{StaffMember, StaffStatus},
    student::{Student, StudentStatus},
    transaction::Transaction,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct StudentCounts {
    pub total: i64,
    pub active: i64,
    pub graduated: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct StaffCounts {
    pub total: i64,
    pub active: i64,
    /// Sum of active staff salaries.
    pub total_salaries: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct FinanceSummary {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub transactions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct InstitutionStats {
    pub students: StudentCounts,
    pub staff: StaffCounts,
    /// Only filled in for global admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub finances: Option<FinanceSummary>,
}

impl InstitutionStats {
    pub async fn collect(pool: &SqlitePool, include_finances: bool) -> Result<Self, sqlx::Error> {
        let students = StudentCounts {
            total: Student::count(pool).await?,
            active: Student::count_by_status(pool, StudentStatus::Active).await?,
            graduated: Student::count_by_status(pool, StudentStatus::Graduated).await?,
        };
        let staff = StaffCounts {
            total: StaffMember::count(pool).await?,
            active: StaffMember::count_by_status(pool, StaffStatus::Active).await?,
            total_salaries: StaffMember::active_salary_total(pool).await?,
        };
        let finances = if include_finances {
            let (total_revenue, total_expenses) = Transaction::lifetime_totals(pool).await?;
            Some(FinanceSummary {
                total_revenue,
                total_expenses,
                balance: total_revenue - total_expenses,
                transactions: Transaction::count(pool).await?,
            })
        } else {
            None
        };
        Ok(Self {
            students,
            staff,
            finances,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::{
        DBService,
        models::{
            student::StudentInput,
            transaction::{TransactionInput, TransactionType},
        },
    };
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn finances_only_when_requested() {
        let db = DBService::new_in_memory().await.unwrap();
        for status in [StudentStatus::Active, StudentStatus::Active, StudentStatus::Graduated] {
            let input = StudentInput {
                name: "Aluno".into(),
                email: None,
                phone: None,
                course: None,
                status,
            };
            Student::create(&db.pool, &input, Uuid::new_v4()).await.unwrap();
        }
        let tx = TransactionInput {
            transaction_type: TransactionType::Revenue,
            category: "Propinas".into(),
            amount: 120.0,
            description: None,
            transaction_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        };
        Transaction::create(&db.pool, &tx, None, Uuid::new_v4()).await.unwrap();

        let staff_view = InstitutionStats::collect(&db.pool, false).await.unwrap();
        assert_eq!(staff_view.students, StudentCounts { total: 3, active: 2, graduated: 1 });
        assert!(staff_view.finances.is_none());
        let json = serde_json::to_value(&staff_view).unwrap();
        assert!(json.get("finances").is_none());

        let admin_view = InstitutionStats::collect(&db.pool, true).await.unwrap();
        let finances = admin_view.finances.unwrap();
        assert_eq!(finances.balance, 120.0);
        assert_eq!(finances.transactions, 1);
    }
}
