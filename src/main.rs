//! Word Clash Back binary entrypoint wiring the REST, storage, and sweep layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use word_clash_back::{
    collab::identity::{IdentityProvider, StaticIdentityProvider},
    config::AppConfig,
    routes,
    services::sweep_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config, identity_provider());

    install_storage(app_state.clone()).await;
    tokio::spawn(sweep_service::run(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the identity collaborator: HTTP-backed when an endpoint is
/// configured, otherwise a static directory that resolves nothing.
fn identity_provider() -> Arc<dyn IdentityProvider> {
    #[cfg(feature = "client")]
    if let Ok(base_url) = env::var("IDENTITY_BASE_URL") {
        if !base_url.is_empty() {
            info!(%base_url, "using HTTP identity provider");
            return Arc::new(word_clash_back::collab::identity::HttpIdentityProvider::new(
                base_url,
            ));
        }
    }

    Arc::new(StaticIdentityProvider::default())
}

/// Supervise a MongoDB-backed match store, retrying in the background and
/// toggling degraded mode when connectivity changes.
#[cfg(feature = "mongo-store")]
async fn install_storage(state: SharedState) {
    use word_clash_back::{
        dao::{
            match_store::{
                MatchStore,
                mongodb::{MongoConfig, MongoMatchStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    async fn connect(
        uri: String,
        db_name: Option<String>,
    ) -> Result<Arc<dyn MatchStore>, StorageError> {
        let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
        let store = MongoMatchStore::connect(config).await?;
        Ok(Arc::new(store))
    }

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state, move || {
        connect(uri.clone(), db_name.clone())
    }));
}

/// Install the in-memory match store when no database backend is compiled in.
#[cfg(not(feature = "mongo-store"))]
async fn install_storage(state: SharedState) {
    use word_clash_back::dao::match_store::memory::MemoryMatchStore;

    info!("mongo-store feature disabled; using the in-memory match store");
    state
        .install_match_store(Arc::new(MemoryMatchStore::default()))
        .await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
