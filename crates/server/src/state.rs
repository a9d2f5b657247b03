use db::DBService;
use services::services::{
    auth::{AuthService, AuthenticatedUser},
    recommendations::RecommendationService,
    sqlite_data::SqliteDataService,
};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    auth: AuthService,
    recommendations: Option<RecommendationService>,
}

impl AppState {
    pub fn new(db: DBService, auth: AuthService, recommendations: Option<RecommendationService>) -> Self {
        Self {
            db,
            auth,
            recommendations,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Data service whose writes are attributed to `user`.
    pub fn data_for(&self, user: &AuthenticatedUser) -> SqliteDataService {
        SqliteDataService::new(self.db.clone())
            .acting_as(user.id)
            .with_recommendations(self.recommendations.clone())
    }
}
