//! Finance endpoints. Every route here is global-admin only.

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    middleware::from_fn,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::{Datelike, Utc};
use db::models::transaction::{Transaction, TransactionInput};
use serde::Deserialize;
use services::services::{
    auth::AuthenticatedUser,
    data_service::Repository,
    finance_report::{self, BalanceReport},
    validation::TransactionForm,
};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::validated;
use crate::{error::ApiError, middleware::auth::require_global_admin, state::AppState};

/// Missing fields default to the current month.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<Vec<Transaction>>>, ApiError> {
    let transactions = Repository::<Transaction>::list(&state.data_for(&user)).await?;
    Ok(ResponseJson(ApiResponse::success(transactions)))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ResponseJson(payload): ResponseJson<TransactionInput>,
) -> Result<ResponseJson<ApiResponse<Transaction>>, ApiError> {
    let input = validated::<TransactionForm, _>(&payload)?;
    let transaction = Repository::<Transaction>::insert(&state.data_for(&user), &input).await?;
    info!(
        transaction_id = %transaction.id,
        kind = %transaction.transaction_type,
        amount = transaction.amount,
        by = %user.email,
        "transaction recorded"
    );
    Ok(ResponseJson(ApiResponse::success(transaction)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<TransactionInput>,
) -> Result<ResponseJson<ApiResponse<Transaction>>, ApiError> {
    let input = validated::<TransactionForm, _>(&payload)?;
    let transaction = Repository::<Transaction>::update(&state.data_for(&user), id, &input).await?;
    Ok(ResponseJson(ApiResponse::success(transaction)))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Repository::<Transaction>::remove(&state.data_for(&user), id).await?;
    info!(transaction_id = %id, by = %user.email, "transaction deleted");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn monthly_balance(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<ResponseJson<ApiResponse<BalanceReport>>, ApiError> {
    let today = Utc::now().date_naive();
    let report = finance_report::monthly(
        &state.db().pool,
        query.year.unwrap_or(today.year()),
        query.month.unwrap_or(today.month()),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn annual_balance(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<ResponseJson<ApiResponse<BalanceReport>>, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let report = finance_report::annual(&state.db().pool, year).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/finances",
        Router::new()
            .route("/transactions", get(list_transactions).post(create_transaction))
            .route("/transactions/{id}", put(update_transaction).delete(delete_transaction))
            .route("/balance/monthly", get(monthly_balance))
            .route("/balance/annual", get(annual_balance))
            .route_layer(from_fn(require_global_admin)),
    )
}
