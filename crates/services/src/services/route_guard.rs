//! Which views a session may enter, and where to send it otherwise.
//!
//! The decision is three-valued: while the session is still being restored
//! the guard answers [`GuardDecision::Pending`] so nothing role-dependent is
//! rendered and no redirect fires.

use db::models::user_account::UserRole;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::session::SessionState;

pub const LOGIN_PATH: &str = "/auth";
pub const DEFAULT_LANDING: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Authenticated,
    GlobalAdmin,
}

impl Access {
    /// Whether a signed-in user with `role` satisfies this requirement.
    pub fn permits(self, role: Option<UserRole>) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::GlobalAdmin => role == Some(UserRole::GlobalAdmin),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub enum AppRoute {
    Index,
    Auth,
    Dashboard,
    Students,
    Staff,
    Finances,
    Recommendations,
    NotFound,
}

impl AppRoute {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => AppRoute::Index,
            "/auth" => AppRoute::Auth,
            "/dashboard" => AppRoute::Dashboard,
            "/students" => AppRoute::Students,
            "/staff" => AppRoute::Staff,
            "/finances" => AppRoute::Finances,
            "/recommendations" => AppRoute::Recommendations,
            _ => AppRoute::NotFound,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AppRoute::Index => "/",
            AppRoute::Auth => LOGIN_PATH,
            AppRoute::Dashboard => DEFAULT_LANDING,
            AppRoute::Students => "/students",
            AppRoute::Staff => "/staff",
            AppRoute::Finances => "/finances",
            AppRoute::Recommendations => "/recommendations",
            AppRoute::NotFound => "*",
        }
    }

    pub fn access(self) -> Access {
        match self {
            AppRoute::Index | AppRoute::Auth | AppRoute::NotFound => Access::Public,
            AppRoute::Dashboard | AppRoute::Students | AppRoute::Staff => Access::Authenticated,
            AppRoute::Finances | AppRoute::Recommendations => Access::GlobalAdmin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session not resolved yet: show a neutral loading state.
    Pending,
    Allow,
    RedirectToLogin { from: String },
    RedirectTo { to: String },
}

impl GuardDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, GuardDecision::Pending)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::RedirectToLogin { .. } => Some(LOGIN_PATH),
            GuardDecision::RedirectTo { to } => Some(to),
            _ => None,
        }
    }
}

pub fn can_enter(path: &str, state: &SessionState) -> GuardDecision {
    let access = AppRoute::from_path(path).access();
    if access == Access::Public {
        return GuardDecision::Allow;
    }
    match state {
        SessionState::Unknown => GuardDecision::Pending,
        SessionState::Anonymous => GuardDecision::RedirectToLogin {
            from: path.to_string(),
        },
        SessionState::Authenticated(session) => {
            if access.permits(session.role) {
                GuardDecision::Allow
            } else {
                GuardDecision::RedirectTo {
                    to: DEFAULT_LANDING.to_string(),
                }
            }
        }
    }
}

/// Where to go after a successful login. Only known in-app views qualify;
/// `//host` and backslash paths would leave the app.
pub fn post_login_target(from: Option<&str>) -> String {
    let in_app = |path: &str| {
        path.starts_with('/')
            && !path.starts_with("//")
            && !path.contains('\\')
            && !matches!(AppRoute::from_path(path), AppRoute::Auth | AppRoute::NotFound)
    };
    match from {
        Some(path) if in_app(path) => path.to_string(),
        _ => DEFAULT_LANDING.to_string(),
    }
}

/// One navigation attempt. The first non-pending decision sticks; later
/// session changes do not re-evaluate it.
#[derive(Debug, Clone)]
pub struct Navigation {
    path: String,
    settled: Option<GuardDecision>,
}

impl Navigation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            settled: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn observe(&mut self, state: &SessionState) -> GuardDecision {
        if let Some(decision) = &self.settled {
            return decision.clone();
        }
        let decision = can_enter(&self.path, state);
        if !decision.is_pending() {
            self.settled = Some(decision.clone());
        }
        decision
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }
}
