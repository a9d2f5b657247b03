use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn,
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use db::models::student::{Student, StudentInput};
use services::services::{auth::AuthenticatedUser, data_service::Repository, validation::StudentForm};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::validated;
use crate::{error::ApiError, middleware::auth::require_global_admin, state::AppState};

pub async fn list_students(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<Vec<Student>>>, ApiError> {
    let students = Repository::<Student>::list(&state.data_for(&user)).await?;
    Ok(ResponseJson(ApiResponse::success(students)))
}

pub async fn create_student(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ResponseJson(payload): ResponseJson<StudentInput>,
) -> Result<ResponseJson<ApiResponse<Student>>, ApiError> {
    let input = validated::<StudentForm, _>(&payload)?;
    let student = Repository::<Student>::insert(&state.data_for(&user), &input).await?;
    info!(student_id = %student.id, by = %user.email, "student created");
    Ok(ResponseJson(ApiResponse::success(student)))
}

pub async fn update_student(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ResponseJson(payload): ResponseJson<StudentInput>,
) -> Result<ResponseJson<ApiResponse<Student>>, ApiError> {
    let input = validated::<StudentForm, _>(&payload)?;
    let student = Repository::<Student>::update(&state.data_for(&user), id, &input).await?;
    Ok(ResponseJson(ApiResponse::success(student)))
}

pub async fn delete_student(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Repository::<Student>::remove(&state.data_for(&user), id).await?;
    info!(student_id = %id, by = %user.email, "student deleted");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{id}",
            put(update_student).merge(delete(delete_student).route_layer(from_fn(require_global_admin))),
        )
}
