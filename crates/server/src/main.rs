//! Cushion catalog server.
//!
//! Serves the fabric catalog API on port 3000 (see `config.rs` for the
//! environment variables).
//!
//! # Backends
//!
//! - `PostgreSQL` key-value table when `CATALOG_DATABASE_URL` or
//!   `DATABASE_URL` is set, otherwise an in-memory store
//! - Supabase Storage for fabric images

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use cushion_server::{
    config::ServerConfig,
    kv::{KvStore, MemoryKvStore, PgKvStore, create_pool},
    services::spawn_startup_sync,
    state::AppState,
    storage::{ObjectStorage, SupabaseStorage},
};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentry reporting when `SENTRY_DSN` is set. The guard flushes on drop.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.sentry_environment.clone().map(Into::into),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            send_default_pii: false,
            ..Default::default()
        },
    ));
    sentry::configure_scope(|scope| scope.set_tag("storage.project", config.supabase.url.as_str()));
    Some(guard)
}

/// Failed syncs and store errors are reported; sync progress and skipped
/// records only ride along as breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cushion_server=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let kv: Arc<dyn KvStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            // Migrations are NOT run on startup: cargo run -p cushion-cli -- migrate
            Arc::new(PgKvStore::new(pool))
        }
        None => {
            tracing::warn!("no database URL configured, using in-memory store (data is lost on exit)");
            Arc::new(MemoryKvStore::new())
        }
    };

    let storage: Arc<dyn ObjectStorage> = Arc::new(
        SupabaseStorage::new(&config.supabase).expect("Failed to create storage client"),
    );

    let state = AppState::new(kv, storage);

    if config.sync_on_startup {
        spawn_startup_sync(state.storage_handle(), state.kv_handle());
    }

    let app = cushion_server::app(state, &config.http);

    let addr = config.http.socket_addr();
    tracing::info!(
        "catalog listening on http://{}{}",
        addr,
        config.http.base_path
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
