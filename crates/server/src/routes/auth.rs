use axum::{
    Extension, Form, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::Deserialize;
use services::services::{
    auth::{AuthenticatedUser, IssuedToken},
    data_service::SessionInfo,
};
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

/// OAuth2 password-grant style form; `username` is the email.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<ResponseJson<ApiResponse<IssuedToken>>, ApiError> {
    let token = state.auth().login(&form.username, &form.password).await?;
    Ok(ResponseJson(ApiResponse::success(token)))
}

pub async fn current_session(
    Extension(user): Extension<AuthenticatedUser>,
) -> ResponseJson<ApiResponse<SessionInfo>> {
    ResponseJson(ApiResponse::success(SessionInfo {
        email: user.email,
        role: user.role,
    }))
}

/// `POST /auth/token`, open to everyone.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/token", post(issue_token))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/auth/session", get(current_session))
}
