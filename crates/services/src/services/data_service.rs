//! Boundary to the remote data service: table CRUD, serverless-style
//! functions and sign-in. Everything behind these traits may fail with a
//! [`DataError`], which carries the backend's own error code and is only ever
//! shown to users after going through `error_classifier::classify`.

use async_trait::async_trait;
use db::models::{
    feedback::FeedbackInput,
    staff::{StaffInput, StaffMember},
    student::{Student, StudentInput},
    transaction::{Transaction, TransactionInput},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

/// Error codes as they travel across the boundary. Database codes follow
/// Postgres SQLSTATE so both backends speak the same vocabulary.
pub mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
    pub const JWT_REJECTED: &str = "PGRST301";
    pub const NO_ROWS: &str = "PGRST116";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const USER_INACTIVE: &str = "user_inactive";
    pub const VALIDATION_FAILED: &str = "validation_failed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorKind {
    /// Rejected by the store (constraint, missing row, privilege).
    Database,
    /// Rejected by authentication.
    Auth,
    /// The request never got an answer.
    Transport,
    /// A function ran and failed.
    Function,
    /// The answer could not be decoded.
    Decode,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind:?} error (code: {code:?}, status: {status:?}): {message}")]
pub struct DataError {
    pub kind: DataErrorKind,
    pub code: Option<String>,
    pub status: Option<u16>,
    /// Raw backend text. Never displayed.
    pub message: String,
}

impl DataError {
    pub fn new(kind: DataErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn database(code: &str, message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Database, message).with_code(code)
    }

    pub fn not_found() -> Self {
        Self::database(codes::NO_ROWS, "no rows returned").with_status(404)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Transport, message)
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match &err {
            sqlx::Error::RowNotFound => DataError::not_found(),
            sqlx::Error::Database(db_err) => {
                let code = match db_err.kind() {
                    ErrorKind::UniqueViolation => codes::UNIQUE_VIOLATION,
                    ErrorKind::ForeignKeyViolation => codes::FOREIGN_KEY_VIOLATION,
                    ErrorKind::NotNullViolation => codes::NOT_NULL_VIOLATION,
                    ErrorKind::CheckViolation => codes::CHECK_VIOLATION,
                    _ => return DataError::new(DataErrorKind::Database, err.to_string()),
                };
                DataError::database(code, db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::transport(err.to_string())
            }
            _ => DataError::new(DataErrorKind::Database, err.to_string()),
        }
    }
}

/// A row type living in one table of the data service.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Fields accepted on insert and update.
    type Input: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;
    const TABLE: &'static str;
    /// HTTP collection path on the server.
    const ENDPOINT: &'static str;

    fn id(&self) -> Uuid;
}

impl Record for Student {
    type Input = StudentInput;
    const TABLE: &'static str = "students";
    const ENDPOINT: &'static str = "/api/students";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for StaffMember {
    type Input = StaffInput;
    const TABLE: &'static str = "staff";
    const ENDPOINT: &'static str = "/api/staff";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Transaction {
    type Input = TransactionInput;
    const TABLE: &'static str = "financial_transactions";
    const ENDPOINT: &'static str = "/api/finances/transactions";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Whole table in the service's default order.
    async fn list(&self) -> Result<Vec<R>, DataError>;
    async fn insert(&self, input: &R::Input) -> Result<R, DataError>;
    async fn update(&self, id: Uuid, input: &R::Input) -> Result<R, DataError>;
    async fn remove(&self, id: Uuid) -> Result<(), DataError>;
}

pub mod functions {
    pub const CREATE_STAFF_USER: &str = "create-staff-user";
    pub const AI_RECOMMENDATIONS: &str = "ai-recommendations";
}

#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, DataError>;
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn submit_feedback(&self, input: &FeedbackInput) -> Result<(), DataError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// What the backend says about a still-valid token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ts_rs::TS)]
pub struct SessionInfo {
    pub email: String,
    pub role: Option<db::models::user_account::UserRole>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an access token.
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, DataError>;
    async fn sign_out(&self, token: &str) -> Result<(), DataError>;
    async fn get_session(&self, token: &str) -> Result<SessionInfo, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_no_rows() {
        let err = DataError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind, DataErrorKind::Database);
        assert!(err.is_code(codes::NO_ROWS));
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn pool_timeout_is_transport() {
        let err = DataError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, DataErrorKind::Transport);
    }
}
