use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Envelope used by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T, E = ErrorInfo> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

/// Machine-readable part of an error response. `code` is a SQLSTATE-style code
/// (`23505`, `42501`, ...) or an auth code such as `invalid_credentials`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: Option<String>,
    /// Field-level validation failures, shown inline by forms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            fields: Vec::new(),
        }
    }
}

impl<T, E> ApiResponse<T, E> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error_data: None,
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn error_with_data(data: E, message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: Some(data),
            message: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error_data(&self) -> Option<&E> {
        self.error_data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_code() {
        let resp: ApiResponse<()> = ApiResponse::error_with_data(
            ErrorInfo::code("23505"),
            "Este registo já existe",
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_data"]["code"], "23505");
        assert_eq!(json["message"], "Este registo já existe");
        assert!(json["error_data"].get("fields").is_none());
    }
}
