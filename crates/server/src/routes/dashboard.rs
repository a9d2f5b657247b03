use axum::{Extension, Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::{auth::AuthenticatedUser, stats::InstitutionStats};
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

/// Counts for the dashboard cards. Finance totals are left out unless the
/// caller is a global admin.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<InstitutionStats>>, ApiError> {
    let stats = InstitutionStats::collect(&state.db().pool, user.is_global_admin()).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(get_stats))
}
