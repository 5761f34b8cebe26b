mod routes;

use crate::config::AppConfig;
use crate::pipeline::completion::{CompletionBackend, CompletionClient, RetryPolicy};
use crate::session::{InMemorySessionStore, SessionStore};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Uploaded PDFs can be large; the axum default of 2 MiB is far too small.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const ARTICLE_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub completion: Arc<dyn CompletionBackend>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let completion = CompletionClient::new(
            config.completion.endpoint.clone(),
            config.completion.model.clone(),
            config.completion.api_key.clone(),
            Duration::from_secs(config.completion.timeout_secs),
            RetryPolicy {
                max_attempts: config.completion.retry_max_attempts,
                base_delay: Duration::from_millis(config.completion.retry_base_delay_ms),
            },
        )
        .context("failed to build completion client")?;

        let sessions = InMemorySessionStore::new(
            config.session.max_entries,
            Duration::from_secs(config.session.ttl_secs),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ARTICLE_FETCH_TIMEOUT_SECS))
            .build()
            .context("failed to build article fetch client")?;

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            completion: Arc::new(completion),
            http,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/summarize", post(routes::summarize))
        .route("/api/chat", post(routes::chat))
        .route("/api/session/:id", get(routes::get_session))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
