use axum::{Router, response::Json as ResponseJson, routing::get};
use utils::response::ApiResponse;

use crate::state::AppState;

pub async fn health_check() -> ResponseJson<ApiResponse<String>> {
    ResponseJson(ApiResponse::success("OK".to_string()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
