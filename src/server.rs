use crate::error::AppError;
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{
        Html,
        IntoResponse,
    },
    routing::get,
    Router,
};
use prometheus::{
    Encoder as _,
    Registry,
    TextEncoder,
};
use std::sync::Arc;

const INDEX: &str = "<html><body><h1>Welcome to speedtest-exporter</h1>Click <a href='/metrics'>here</a> to see metrics.</body></html>";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

pub fn create_router(registry: Arc<Registry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX)
}

/// Gathering can block for a whole speedtest, so it runs on the blocking pool.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let registry = state.registry.clone();
    let body = tokio::task::spawn_blocking(move || {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer)?;
        Ok::<_, prometheus::Error>(buffer)
    })
    .await??;

    Ok(([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

async fn healthz() -> &'static str {
    "OK"
}
