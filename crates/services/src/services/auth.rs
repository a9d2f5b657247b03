//! Server-side authentication: password hashing, token issuing and
//! resolving a bearer token back to an account.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use db::models::user_account::{CreateUserAccount, UserAccount, UserRole};
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use utils::jwt::{self, Claims, TokenError};
use uuid::Uuid;

use super::data_service::{
    AuthBackend, Credentials, DataError, DataErrorKind, SessionInfo, codes,
};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account disabled")]
    Inactive,
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("unknown account")]
    UnknownAccount,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<AuthServiceError> for DataError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => {
                DataError::new(DataErrorKind::Auth, err.to_string())
                    .with_code(codes::INVALID_CREDENTIALS)
                    .with_status(401)
            }
            AuthServiceError::Inactive => DataError::new(DataErrorKind::Auth, err.to_string())
                .with_code(codes::USER_INACTIVE)
                .with_status(401),
            AuthServiceError::Token(_) | AuthServiceError::UnknownAccount => {
                DataError::new(DataErrorKind::Auth, err.to_string())
                    .with_code(codes::JWT_REJECTED)
                    .with_status(401)
            }
            AuthServiceError::Hashing(_) => DataError::new(DataErrorKind::Auth, err.to_string()),
            AuthServiceError::Database(e) => e.into(),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthServiceError::Hashing(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| AuthServiceError::Hashing(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthServiceError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// OAuth2-style token response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Account behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Option<UserRole>,
}

impl AuthenticatedUser {
    pub fn is_global_admin(&self) -> bool {
        self.role == Some(UserRole::GlobalAdmin)
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    secret: String,
    ttl: Duration,
}

impl AuthService {
    pub fn new(pool: SqlitePool, secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            pool,
            secret: secret.into(),
            ttl,
        }
    }

    /// Check email and password, returning the account.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserAccount, AuthServiceError> {
        let Some(account) = UserAccount::find_by_email(&self.pool, email.trim()).await? else {
            return Err(AuthServiceError::InvalidCredentials);
        };
        if !verify_password(&account.password_hash, password) {
            return Err(AuthServiceError::InvalidCredentials);
        }
        if !account.is_active {
            return Err(AuthServiceError::Inactive);
        }
        Ok(account)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthServiceError> {
        let account = self.authenticate(email, password).await.inspect_err(|e| {
            warn!(email = %email, reason = %e, "login rejected");
        })?;
        let claims = Claims::new(&account.email, account.role.map(|r| r.to_string()), self.ttl);
        let access_token = jwt::sign(&claims, &self.secret)?;
        info!(email = %account.email, role = ?account.role, "login");
        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_at: claims.expires_at(),
        })
    }

    /// Verify the token and reload the account, so role changes and
    /// deactivation take effect before the token expires.
    pub async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthServiceError> {
        let claims = jwt::verify(token, &self.secret)?;
        let account = UserAccount::find_by_email(&self.pool, &claims.sub)
            .await?
            .ok_or(AuthServiceError::UnknownAccount)?;
        if !account.is_active {
            return Err(AuthServiceError::Inactive);
        }
        Ok(AuthenticatedUser {
            id: account.id,
            email: account.email,
            role: account.role,
        })
    }

    /// Create the first global admin if none exists yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AuthServiceError> {
        if UserAccount::count_with_role(&self.pool, UserRole::GlobalAdmin).await? > 0 {
            return Ok(false);
        }
        let account = CreateUserAccount {
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password)?,
            full_name: Some("Administrador".to_string()),
            role: Some(UserRole::GlobalAdmin),
        };
        UserAccount::create(&self.pool, &account, Uuid::new_v4()).await?;
        info!(email = %account.email, "created initial global admin");
        Ok(true)
    }
}

/// [`AuthBackend`] running in-process against the local database.
#[derive(Clone)]
pub struct LocalAuthBackend {
    auth: AuthService,
}

impl LocalAuthBackend {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl AuthBackend for LocalAuthBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, DataError> {
        Ok(self
            .auth
            .login(&credentials.email, &credentials.password)
            .await?
            .access_token)
    }

    async fn sign_out(&self, _token: &str) -> Result<(), DataError> {
        // Tokens are stateless; they lapse at `exp`.
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<SessionInfo, DataError> {
        let user = self.auth.resolve(token).await?;
        Ok(SessionInfo {
            email: user.email,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    async fn service() -> AuthService {
        let db = DBService::new_in_memory().await.unwrap();
        AuthService::new(db.pool, "secret", Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    #[test]
    fn hashes_verify_and_are_salted() {
        let a = hash_password("palavra-passe").unwrap();
        let b = hash_password("palavra-passe").unwrap();
        assert_ne!(a, b);
        assert!(verify_password(&a, "palavra-passe"));
        assert!(!verify_password(&a, "outra"));
        assert!(!verify_password("not-a-phc-string", "palavra-passe"));
    }

    #[tokio::test]
    async fn bootstrap_login_and_resolve() {
        let auth = service().await;
        assert!(auth.ensure_admin("Admin@Escola.pt", "admin-pass").await.unwrap());
        assert!(!auth.ensure_admin("other@escola.pt", "x").await.unwrap());

        let issued = auth.login("admin@escola.pt", "admin-pass").await.unwrap();
        let claims = jwt::peek(&issued.access_token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("global_admin"));

        let user = auth.resolve(&issued.access_token).await.unwrap();
        assert!(user.is_global_admin());
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_accounts_are_rejected() {
        let auth = service().await;
        auth.ensure_admin("admin@escola.pt", "admin-pass").await.unwrap();
        assert!(matches!(
            auth.login("admin@escola.pt", "nope").await,
            Err(AuthServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ghost@escola.pt", "admin-pass").await,
            Err(AuthServiceError::InvalidCredentials)
        ));

        let account = UserAccount::find_by_email(&auth.pool, "admin@escola.pt").await.unwrap().unwrap();
        let token = auth.login("admin@escola.pt", "admin-pass").await.unwrap().access_token;
        UserAccount::set_active(&auth.pool, account.id, false).await.unwrap();
        assert!(matches!(auth.resolve(&token).await, Err(AuthServiceError::Inactive)));
    }

    #[tokio::test]
    async fn backend_errors_carry_codes() {
        let backend = LocalAuthBackend::new(service().await);
        let err = backend
            .sign_in(&Credentials {
                email: "x@y.pt".into(),
                password: "12345678".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_code(codes::INVALID_CREDENTIALS));
        assert_eq!(err.status, Some(401));

        let err = backend.get_session("garbage").await.unwrap_err();
        assert!(err.is_code(codes::JWT_REJECTED));
    }
}
