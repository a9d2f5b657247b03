//! Single translation point from backend errors to what the user sees.
//!
//! Call sites never inspect raw [`DataError`]s: they classify once into a
//! [`ClientError`] and display [`ClientError::user_message`].

use thiserror::Error;
use tracing::debug;

use super::{
    data_service::{DataError, DataErrorKind, codes},
    validation::FieldError,
};

pub mod messages {
    pub const UNIQUE: &str = "Este registo já existe";
    pub const FOREIGN_KEY: &str = "Não é possível eliminar - existem registos relacionados";
    pub const MISSING_FIELD: &str = "Campos obrigatórios em falta";
    pub const PERMISSION_DENIED: &str = "Não tem permissão para esta operação";
    pub const UNAUTHORIZED: &str = "Acesso negado";
    pub const INVALID_CREDENTIALS: &str =
        "Credenciais inválidas. Verifique o seu email e palavra-passe.";
    pub const NETWORK: &str = "Não foi possível conectar ao servidor.";
    pub const LOGIN_FAILED: &str = "Erro ao tentar entrar.";
    pub const VALIDATION: &str = "Erro de validação";
    pub const GENERIC: &str = "Ocorreu um erro. Por favor, tente novamente.";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("network unavailable")]
    NetworkUnavailable,
    #[error("unauthorized")]
    Unauthorized,
    #[error("unknown authentication failure")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Unique,
    ForeignKey,
    MissingField,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("authentication: {0}")]
    Auth(AuthError),
    #[error("data conflict: {0:?}")]
    DataConflict(Conflict),
    #[error("permission denied")]
    PermissionDenied,
    #[error("server unreachable")]
    TransientNetwork,
    #[error("unclassified failure")]
    Unknown,
}

impl ClientError {
    /// Fixed, user-safe sentence for this class of failure.
    pub fn user_message(&self) -> &str {
        match self {
            ClientError::Validation(errors) => errors
                .first()
                .map(|e| e.message.as_str())
                .unwrap_or(messages::VALIDATION),
            ClientError::Auth(AuthError::InvalidCredentials) => messages::INVALID_CREDENTIALS,
            ClientError::Auth(AuthError::NetworkUnavailable) => messages::NETWORK,
            ClientError::Auth(AuthError::Unauthorized) => messages::UNAUTHORIZED,
            ClientError::Auth(AuthError::Unknown) => messages::LOGIN_FAILED,
            ClientError::DataConflict(Conflict::Unique) => messages::UNIQUE,
            ClientError::DataConflict(Conflict::ForeignKey) => messages::FOREIGN_KEY,
            ClientError::DataConflict(Conflict::MissingField) => messages::MISSING_FIELD,
            ClientError::PermissionDenied => messages::PERMISSION_DENIED,
            ClientError::TransientNetwork => messages::NETWORK,
            ClientError::Unknown => messages::GENERIC,
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        ClientError::Auth(err)
    }
}

impl From<DataError> for ClientError {
    fn from(err: DataError) -> Self {
        classify(&err)
    }
}

fn log_raw(err: &DataError) {
    if cfg!(debug_assertions) {
        debug!(kind = ?err.kind, code = ?err.code, status = ?err.status, message = %err.message, "backend error");
    }
}

pub fn classify(err: &DataError) -> ClientError {
    log_raw(err);

    if err.kind == DataErrorKind::Transport {
        return ClientError::TransientNetwork;
    }

    match err.code.as_deref() {
        Some(codes::UNIQUE_VIOLATION) => ClientError::DataConflict(Conflict::Unique),
        Some(codes::FOREIGN_KEY_VIOLATION) => ClientError::DataConflict(Conflict::ForeignKey),
        Some(codes::NOT_NULL_VIOLATION) => ClientError::DataConflict(Conflict::MissingField),
        Some(codes::INSUFFICIENT_PRIVILEGE) => ClientError::PermissionDenied,
        Some(codes::JWT_REJECTED) => ClientError::Auth(AuthError::Unauthorized),
        Some(codes::INVALID_CREDENTIALS) => ClientError::Auth(AuthError::InvalidCredentials),
        Some(codes::USER_INACTIVE) => ClientError::Auth(AuthError::Unauthorized),
        _ => match err.status {
            Some(401) => ClientError::Auth(AuthError::Unauthorized),
            Some(403) => ClientError::PermissionDenied,
            _ => ClientError::Unknown,
        },
    }
}

/// Narrower mapping used by login: everything that is not a credential or
/// transport problem is `Unknown`.
pub fn classify_sign_in(err: &DataError) -> AuthError {
    log_raw(err);

    if err.kind == DataErrorKind::Transport {
        return AuthError::NetworkUnavailable;
    }
    if err.is_code(codes::INVALID_CREDENTIALS)
        || (err.kind == DataErrorKind::Auth && err.status == Some(401))
    {
        return AuthError::InvalidCredentials;
    }
    AuthError::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_codes_map_to_fixed_messages() {
        let cases = [
            (codes::UNIQUE_VIOLATION, messages::UNIQUE),
            (codes::FOREIGN_KEY_VIOLATION, messages::FOREIGN_KEY),
            (codes::NOT_NULL_VIOLATION, messages::MISSING_FIELD),
            (codes::INSUFFICIENT_PRIVILEGE, messages::PERMISSION_DENIED),
            (codes::JWT_REJECTED, messages::UNAUTHORIZED),
        ];
        for (code, expected) in cases {
            let err = DataError::database(code, "duplicate key value violates unique constraint \"students_email_key\"");
            assert_eq!(classify(&err).user_message(), expected, "code {code}");
        }
    }

    #[test]
    fn raw_text_never_leaks() {
        let err = DataError::database("XX000", "internal: relation \"secret_table\" is broken");
        let msg = classify(&err).user_message().to_string();
        assert_eq!(msg, messages::GENERIC);
        assert!(!msg.contains("secret_table"));
    }

    #[test]
    fn transport_is_network_regardless_of_code() {
        let err = DataError::transport("connection refused").with_code(codes::UNIQUE_VIOLATION);
        assert_eq!(classify(&err), ClientError::TransientNetwork);
    }

    #[test]
    fn http_status_fallbacks() {
        let unauthorized = DataError::new(DataErrorKind::Auth, "jwt expired").with_status(401);
        assert_eq!(classify(&unauthorized), ClientError::Auth(AuthError::Unauthorized));
        let forbidden = DataError::new(DataErrorKind::Function, "nope").with_status(403);
        assert_eq!(classify(&forbidden), ClientError::PermissionDenied);
    }

    #[test]
    fn sign_in_classification() {
        let bad = DataError::new(DataErrorKind::Auth, "Invalid login credentials")
            .with_code(codes::INVALID_CREDENTIALS)
            .with_status(401);
        assert_eq!(classify_sign_in(&bad), AuthError::InvalidCredentials);
        assert_eq!(
            classify_sign_in(&DataError::transport("dns")),
            AuthError::NetworkUnavailable
        );
        assert_eq!(
            classify_sign_in(&DataError::new(DataErrorKind::Decode, "bad json")),
            AuthError::Unknown
        );
    }

    #[test]
    fn validation_shows_first_issue() {
        let err = ClientError::Validation(vec![
            FieldError::new("amount", "Valor deve ser maior que zero"),
            FieldError::new("category", "Categoria é obrigatória"),
        ]);
        assert_eq!(err.user_message(), "Valor deve ser maior que zero");
        assert_eq!(ClientError::Validation(vec![]).user_message(), messages::VALIDATION);
    }
}
