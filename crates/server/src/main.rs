use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{app, config::ServerConfig, state::AppState};
use services::services::{
    ai_client::AiClient,
    auth::AuthService,
    database_validator::DatabaseValidator,
    recommendations::RecommendationService,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _sentry = utils::logging::init("escola-server");

    let config = ServerConfig::from_env()?;
    if let Some(parent) = config.sqlite_file().as_deref().and_then(|f| f.parent()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let db = DBService::new(&config.database_url)
        .await
        .context("opening database")?;
    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    info!("{}", validation.summary());

    let auth = AuthService::new(db.pool.clone(), config.jwt_secret.clone(), config.token_ttl);
    match &config.admin {
        Some(admin) => {
            if auth.ensure_admin(&admin.email, &admin.password).await? {
                info!(email = %admin.email, "bootstrap admin created");
            }
        }
        None => info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin bootstrap"),
    }

    let recommendations = match AiClient::from_env() {
        Ok(client) => {
            info!(model = client.model(), "AI recommendations enabled");
            Some(RecommendationService::new(Arc::new(client)))
        }
        Err(e) => {
            warn!(error = %e, "AI recommendations disabled");
            None
        }
    };

    let state = AppState::new(db, auth, recommendations);
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app(state, &config.cors_origins))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
