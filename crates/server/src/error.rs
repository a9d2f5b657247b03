//! Failure to HTTP response. Bodies carry the error code and a fixed
//! Portuguese sentence; raw database and provider text only reaches the log.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthServiceError,
    data_service::{DataError, DataErrorKind, codes},
    error_classifier::{ClientError, classify},
    finance_report::ReportError,
    staff_accounts::StaffAccountError,
    validation::FieldError,
};
use thiserror::Error;
use tracing::{debug, error};
use utils::response::{ApiResponse, ErrorInfo};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Auth(#[from] AuthServiceError),
    #[error(transparent)]
    StaffAccount(#[from] StaffAccountError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("invalid input")]
    Validation(Vec<FieldError>),
    #[error("missing or malformed bearer token")]
    Unauthorized,
    #[error("global admin required")]
    Forbidden,
}

impl ApiError {
    fn into_data_error(self) -> Result<DataError, Vec<FieldError>> {
        Ok(match self {
            ApiError::Data(e) => e,
            ApiError::Auth(e) => e.into(),
            ApiError::StaffAccount(StaffAccountError::Validation(fields)) => return Err(fields),
            ApiError::StaffAccount(e) => e.into(),
            ApiError::Report(ReportError::InvalidPeriod(period)) => {
                return Err(vec![FieldError::new("period", format!("Período inválido: {period}"))]);
            }
            ApiError::Report(ReportError::Database(e)) | ApiError::Database(e) => e.into(),
            ApiError::Validation(fields) => return Err(fields),
            ApiError::Unauthorized => DataError::new(DataErrorKind::Auth, "bearer token required")
                .with_code(codes::JWT_REJECTED)
                .with_status(401),
            ApiError::Forbidden => DataError::database(codes::INSUFFICIENT_PRIVILEGE, "global admin required")
                .with_status(403),
        })
    }
}

fn status_for(err: &DataError) -> StatusCode {
    if let Some(status) = err.status.and_then(|s| StatusCode::from_u16(s).ok()) {
        return status;
    }
    match err.code.as_deref() {
        Some(codes::UNIQUE_VIOLATION | codes::FOREIGN_KEY_VIOLATION) => StatusCode::CONFLICT,
        Some(codes::NOT_NULL_VIOLATION | codes::CHECK_VIOLATION | codes::VALIDATION_FAILED) => {
            StatusCode::BAD_REQUEST
        }
        Some(codes::INSUFFICIENT_PRIVILEGE) => StatusCode::FORBIDDEN,
        Some(codes::JWT_REJECTED | codes::INVALID_CREDENTIALS | codes::USER_INACTIVE) => {
            StatusCode::UNAUTHORIZED
        }
        Some(codes::NO_ROWS) => StatusCode::NOT_FOUND,
        _ if err.kind == DataErrorKind::Transport => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let raw = self.to_string();
        let (status, info, message) = match self.into_data_error() {
            Ok(err) => {
                let status = status_for(&err);
                let message = classify(&err).user_message().to_string();
                (status, ErrorInfo { code: err.code, fields: Vec::new() }, message)
            }
            Err(fields) => {
                let message = ClientError::Validation(fields.clone()).user_message().to_string();
                let info = ErrorInfo {
                    code: Some(codes::VALIDATION_FAILED.to_string()),
                    fields: fields.into_iter().map(Into::into).collect(),
                };
                (StatusCode::BAD_REQUEST, info, message)
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), code = ?info.code, error = %raw, "request failed");
        } else {
            debug!(status = status.as_u16(), code = ?info.code, error = %raw, "request rejected");
        }

        let body: ApiResponse<()> = ApiResponse::error_with_data(info, &message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;
    use services::services::error_classifier::messages;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unique_violation_is_a_sanitized_conflict() {
        let err = DataError::database(codes::UNIQUE_VIOLATION, "UNIQUE constraint failed: students.email");
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_data"]["code"], "23505");
        assert_eq!(body["message"], messages::UNIQUE);
        assert!(!body.to_string().contains("students.email"));
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let err = ApiError::Validation(vec![FieldError::new("amount", "Valor deve ser maior que zero")]);
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_data"]["fields"][0]["field"], "amount");
        assert_eq!(body["message"], "Valor deve ser maior que zero");
    }

    #[tokio::test]
    async fn access_errors() {
        let (status, body) = render(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], messages::PERMISSION_DENIED);

        let (status, body) = render(AuthServiceError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_data"]["code"], codes::INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn unexpected_errors_hide_details() {
        let (status, body) = render(sqlx::Error::Protocol("bad frame from sqlite".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], messages::GENERIC);
    }
}
