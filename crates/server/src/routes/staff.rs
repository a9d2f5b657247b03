use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::staff::{StaffInput, StaffMember};
use services::services::{auth::AuthenticatedUser, data_service::Repository, validation::StaffForm};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::validated;
use crate::{error::ApiError, middleware::auth::require_global_admin, state::AppState};

pub async fn list_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<Vec<StaffMember>>>, ApiError> {
    let staff = Repository::<StaffMember>::list(&state.data_for(&user)).await?;
    Ok(ResponseJson(ApiResponse::success(staff)))
}

/// Staff row without a login account. Accounts go through the
/// `create-staff-user` function.
pub async fn create_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ResponseJson(payload): ResponseJson<StaffInput>,
) -> Result<ResponseJson<ApiResponse<StaffMember>>, ApiError> {
    let input = validated::<StaffForm, _>(&payload)?.staff;
    let member = Repository::<StaffMember>::insert(&state.data_for(&user), &input).await?;
    info!(staff_id = %member.id, by = %user.email, "staff member created");
    Ok(ResponseJson(ApiResponse::success(member)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<StaffInput>,
) -> Result<ResponseJson<ApiResponse<StaffMember>>, ApiError> {
    let input = validated::<StaffForm, _>(&payload)?.staff;
    let member = Repository::<StaffMember>::update(&state.data_for(&user), id, &input).await?;
    Ok(ResponseJson(ApiResponse::success(member)))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Repository::<StaffMember>::remove(&state.data_for(&user), id).await?;
    info!(staff_id = %id, by = %user.email, "staff member deleted");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/staff",
            get(list_staff).merge(post(create_staff).route_layer(from_fn(require_global_admin))),
        )
        .route(
            "/staff/{id}",
            put(update_staff)
                .delete(delete_staff)
                .route_layer(from_fn(require_global_admin)),
        )
}
