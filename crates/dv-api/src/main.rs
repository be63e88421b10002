//! DeckVault HTTP API Service
//!
//! This is the main entry point for the DeckVault API server. It exposes
//! the deck storage verbs over HTTP:
//! - GET    /decks           : list briefs across both formats
//! - GET    /decks/:id       : full deck (legacy shape), 404 when absent
//! - PUT    /decks/:id       : save a deck (body is the legacy shape)
//! - DELETE /decks/:id       : remove a deck in both formats
//! - GET    /decks/:id/meta  : metadata only
//! - GET    /decks/:id/thumb : thumbnail bytes (WebP)

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use dv_adapters::{DeckService, RedisKv};
use dv_ports::{KeyValueStore, NoopRenderer, ThumbnailRenderer};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod handlers;

use config::ApiConfig;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn create_router<S, R>(service: Arc<DeckService<S, R>>) -> Router
where
    S: KeyValueStore + 'static,
    R: ThumbnailRenderer + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/decks", get(handlers::decks::list_decks::<S, R>))
        .route(
            "/decks/:id",
            get(handlers::decks::get_deck::<S, R>)
                .put(handlers::decks::put_deck::<S, R>)
                .delete(handlers::decks::delete_deck::<S, R>),
        )
        .route("/decks/:id/meta", get(handlers::decks::get_deck_meta::<S, R>))
        .route(
            "/decks/:id/thumb",
            get(handlers::decks::get_deck_thumbnail::<S, R>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dv_api=debug,dv_adapters=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env();

    let kv = RedisKv::connect(&config.storage.url)
        .await
        .expect("Failed to connect to the key/value store");
    let service = Arc::new(DeckService::new(Arc::new(kv), NoopRenderer, &config.storage));

    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {e}", config.bind_addr));

    tracing::info!("DeckVault API listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
