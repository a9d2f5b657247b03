use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::department::Department;
use serde::{Deserialize, Serialize};
use services::services::{
    auth::AuthenticatedUser,
    data_service::DataError,
    validation::field,
};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::auth::require_global_admin, state::AppState};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDepartment {
    pub name: String,
}

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Department>>>, ApiError> {
    let departments = Department::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(departments)))
}

pub async fn create_department(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ResponseJson(payload): ResponseJson<CreateDepartment>,
) -> Result<ResponseJson<ApiResponse<Department>>, ApiError> {
    let mut errors = Vec::new();
    let name = field("name", &payload.name)
        .trim()
        .required("Nome é obrigatório")
        .max_len(100, "Nome não pode ter mais de 100 caracteres")
        .check(&mut errors);
    let Some(name) = name.filter(|_| errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };
    let department = Department::create(&state.db().pool, name, Uuid::new_v4()).await?;
    info!(department_id = %department.id, by = %user.email, "department created");
    Ok(ResponseJson(ApiResponse::success(department)))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Department::delete(&state.db().pool, id).await? == 0 {
        return Err(DataError::not_found().into());
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/departments",
            get(list_departments).merge(post(create_department).route_layer(from_fn(require_global_admin))),
        )
        .route(
            "/departments/{id}",
            delete(delete_department).route_layer(from_fn(require_global_admin)),
        )
}
