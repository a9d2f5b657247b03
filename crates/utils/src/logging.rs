//! Tracing subscriber and optional Sentry reporting.

use sentry::ClientInitGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber. When `SENTRY_DSN` is set, errors and panics
/// are also reported to Sentry; keep the returned guard alive for the whole
/// process so queued events get flushed on exit.
pub fn init(service: &'static str) -> Option<ClientInitGuard> {
    let guard = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    server_name: Some(service.into()),
                    ..Default::default()
                },
            ))
        });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let sentry_layer = guard.as_ref().map(|_| sentry_tracing::layer());

    // try_init: tests may install a subscriber more than once
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .try_init();

    guard
}
