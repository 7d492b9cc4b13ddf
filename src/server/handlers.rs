use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use super::client::render_client_html;
use super::extract::extract_request;
use super::models::{ErrorResponse, ExtractRequest, ExtractResponse, SettingsInfo};
use super::state::ServerState;
use crate::extractor::Extractor;
use crate::languages::load_messages;
use crate::providers::{Provider, ProviderImpl};
use crate::settings::Settings;

/// Largest accepted request body. A base64 data URI is a third larger than
/// the photo it carries.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub async fn run_server(
    settings: Settings,
    provider: ProviderImpl,
    addr: Option<String>,
) -> Result<()> {
    let messages = load_messages(&settings.lang, &settings.messages)?;
    let client_html = render_client_html(&settings, &messages)?;
    let state = Arc::new(ServerState {
        extractor: Extractor::new(provider),
        formatter: settings.formatter(),
        messages,
        lang: settings.lang.clone(),
        copy_ack_ms: settings.copy_ack_ms,
        client_html,
    });
    let app = router(state);
    let addr = addr.unwrap_or(settings.server_addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router<P: Provider + 'static>(state: Arc<ServerState<P>>) -> Router {
    Router::new()
        .route("/", get(index::<P>))
        .route("/health", get(health))
        .route("/settings", get(settings_info::<P>))
        .route("/extract", post(extract::<P>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn index<P: Provider>(State(state): State<Arc<ServerState<P>>>) -> Html<String> {
    Html(state.client_html.clone())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn extract<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, (StatusCode, Json<ErrorResponse>)> {
    extract_request(&state.extractor, &state.formatter, &state.messages, payload)
        .await
        .map(Json)
        .map_err(|err| (err.status, Json(ErrorResponse { error: err.message })))
}

async fn settings_info<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
) -> Json<SettingsInfo> {
    Json(SettingsInfo {
        lang: state.lang.clone(),
        line_prefix: state.formatter.prefix().to_string(),
        copy_ack_ms: state.copy_ack_ms,
        labels: state.messages.clone(),
    })
}
