//! Server-side functions (`create-staff-user`, `ai-recommendations`),
//! global-admin only.

use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn,
    response::Json as ResponseJson,
    routing::post,
};
use serde_json::Value;
use services::services::{auth::AuthenticatedUser, data_service::FunctionInvoker};
use tracing::info;
use utils::response::ApiResponse;

use crate::{error::ApiError, middleware::auth::require_global_admin, state::AppState};

pub async fn invoke_function(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(name): Path<String>,
    payload: Option<ResponseJson<Value>>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let payload = payload.map(|ResponseJson(v)| v).unwrap_or(Value::Null);
    let result = state.data_for(&user).invoke(&name, payload).await?;
    info!(function = %name, by = %user.email, "function invoked");
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/functions/{name}",
        post(invoke_function).route_layer(from_fn(require_global_admin)),
    )
}
