//! Client-side session state.
//!
//! The current [`SessionState`] is an immutable value published on a
//! `watch` channel. It starts as `Unknown`, resolves once [`SessionHolder::init`]
//! has looked at the persisted token, and afterwards only changes on login,
//! logout, refresh or token expiry.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use db::models::user_account::UserRole;
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle, time::interval};
use tracing::{debug, info, warn};
use ts_rs::TS;
use utils::jwt::{self, TokenError};

use super::{
    data_service::{AuthBackend, Credentials, DataErrorKind},
    error_classifier::{AuthError, ClientError, classify, classify_sign_in},
    route_guard::post_login_target,
    token_store::TokenStore,
    validation::{Form, LoginForm},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Session {
    /// Account email.
    pub identity: String,
    pub role: Option<UserRole>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    #[ts(skip)]
    pub token: String,
}

impl Session {
    /// Build a session from the claims carried by `token`. The signature is
    /// not checked here; the server does that on every request.
    pub fn from_token(token: &str) -> Result<Self, TokenError> {
        let claims = jwt::peek(token)?;
        Ok(Self {
            identity: claims.sub.clone(),
            role: claims.role.as_deref().and_then(|r| r.parse().ok()),
            expires_at: claims.expires_at(),
            token: token.to_string(),
        })
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn is_global_admin(&self) -> bool {
        self.role == Some(UserRole::GlobalAdmin)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not resolved yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }
}

pub struct SessionHolder {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
}

impl SessionHolder {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            backend,
            store,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    fn forget_token(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted token");
        }
    }

    /// Restore from the persisted token. Expired or unreadable tokens are
    /// removed and the session resolves as anonymous.
    pub fn init(&self) -> SessionState {
        let next = match self.store.load() {
            None => SessionState::Anonymous,
            Some(token) => match Session::from_token(&token) {
                Ok(session) if session.is_fresh(Utc::now()) => {
                    debug!(identity = %session.identity, "restored session");
                    SessionState::Authenticated(session)
                }
                Ok(_) => {
                    info!("persisted token expired");
                    self.forget_token();
                    SessionState::Anonymous
                }
                Err(e) => {
                    warn!(error = %e, "discarding unreadable token");
                    self.forget_token();
                    SessionState::Anonymous
                }
            },
        };
        self.publish(next.clone());
        next
    }

    /// Sign in. On failure nothing is persisted and the state is left as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let token = self
            .backend
            .sign_in(credentials)
            .await
            .map_err(|e| classify_sign_in(&e))?;
        let session = Session::from_token(&token).map_err(|e| {
            warn!(error = %e, "backend issued an unreadable token");
            AuthError::Unknown
        })?;

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "failed to persist token");
        }
        info!(identity = %session.identity, role = ?session.role, "signed in");
        self.publish(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    pub async fn logout(&self) {
        if let Some(session) = self.current() {
            if let Err(e) = self.backend.sign_out(&session.token).await {
                debug!(error = %e, "remote sign-out failed");
            }
            info!(identity = %session.identity, "signed out");
        }
        self.forget_token();
        self.publish(SessionState::Anonymous);
    }

    /// Ask the backend whether the current token is still accepted. A
    /// rejected token ends the session; transport failures keep it.
    pub async fn refresh(&self) -> Result<SessionState, ClientError> {
        let Some(session) = self.current() else {
            return Ok(self.state());
        };
        match self.backend.get_session(&session.token).await {
            Ok(info) => {
                let next = SessionState::Authenticated(Session {
                    identity: info.email,
                    role: info.role,
                    ..session
                });
                self.publish(next.clone());
                Ok(next)
            }
            Err(e) if e.kind == DataErrorKind::Transport => Err(classify(&e)),
            Err(e) => {
                info!(identity = %session.identity, "session rejected by backend");
                self.forget_token();
                self.publish(SessionState::Anonymous);
                Err(classify(&e))
            }
        }
    }

    /// Clear the session if its token expired before `now`.
    pub fn expire_if_stale(&self, now: DateTime<Utc>) -> bool {
        let stale = self
            .current()
            .is_some_and(|session| !session.is_fresh(now));
        if stale {
            info!("session expired");
            self.forget_token();
            self.publish(SessionState::Anonymous);
        }
        stale
    }

    /// Check for token expiry every `period` until the holder is dropped.
    pub fn spawn_expiry_watch(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        let holder = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let Some(holder) = holder.upgrade() else {
                    break;
                };
                holder.expire_if_stale(Utc::now());
            }
        })
    }
}

/// Result of the login screen.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub session: Session,
    /// Where to navigate next.
    pub redirect: String,
}

/// Validate the form, sign in and work out the post-login destination.
/// Invalid input never reaches the backend.
pub async fn submit_login(
    holder: &SessionHolder,
    form: &LoginForm,
    from: Option<&str>,
) -> Result<LoginOutcome, ClientError> {
    let credentials = form.validate().map_err(ClientError::Validation)?;
    let session = holder.login(&credentials).await?;
    Ok(LoginOutcome {
        session,
        redirect: post_login_target(from),
    })
}
