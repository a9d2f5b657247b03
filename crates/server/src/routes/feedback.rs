use axum::{Extension, Router, extract::State, response::Json as ResponseJson, routing::post};
use db::models::feedback::FeedbackInput;
use services::services::{
    auth::AuthenticatedUser, data_service::FeedbackSink, validation::FeedbackForm,
};
use tracing::info;
use utils::response::ApiResponse;

use super::validated;
use crate::{error::ApiError, state::AppState};

pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ResponseJson(payload): ResponseJson<FeedbackInput>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let input = validated::<FeedbackForm, _>(&payload)?;
    state.data_for(&user).submit_feedback(&input).await?;
    info!(category = %input.category, by = %user.email, "feedback received");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/feedback", post(submit_feedback))
}
