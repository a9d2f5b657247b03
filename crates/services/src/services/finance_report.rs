use chrono::{Datelike, NaiveDate};
use db::models::transaction::{CategoryTotal, Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Revenue, expense and balance over one month or one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct BalanceReport {
    /// `YYYY-MM` or `YYYY`.
    pub period: String,
    pub total_revenue: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub by_category: Vec<CategoryTotal>,
}

impl BalanceReport {
    fn from_totals(period: String, by_category: Vec<CategoryTotal>) -> Self {
        let sum = |kind: TransactionType| {
            by_category
                .iter()
                .filter(|t| t.transaction_type == kind)
                .map(|t| t.total)
                .sum::<f64>()
        };
        let total_revenue = sum(TransactionType::Revenue);
        let total_expense = sum(TransactionType::Expense);
        Self {
            period,
            total_revenue,
            total_expense,
            balance: total_revenue - total_expense,
            by_category,
        }
    }
}

/// `[from, until)` for a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ReportError> {
    let invalid = || ReportError::InvalidPeriod(format!("{year}-{month:02}"));
    let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let until = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((from, until))
}

pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), ReportError> {
    let invalid = || ReportError::InvalidPeriod(year.to_string());
    let from = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
    let until = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?;
    Ok((from, until))
}

pub async fn monthly(pool: &SqlitePool, year: i32, month: u32) -> Result<BalanceReport, ReportError> {
    let (from, until) = month_bounds(year, month)?;
    let totals = Transaction::totals_by_category(pool, from, until).await?;
    Ok(BalanceReport::from_totals(
        format!("{}-{:02}", from.year(), from.month()),
        totals,
    ))
}

pub async fn annual(pool: &SqlitePool, year: i32) -> Result<BalanceReport, ReportError> {
    let (from, until) = year_bounds(year)?;
    let totals = Transaction::totals_by_category(pool, from, until).await?;
    Ok(BalanceReport::from_totals(year.to_string(), totals))
}
