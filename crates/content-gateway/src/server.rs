//! HTTP server: routing-tag dispatch, override handling, Drive-backed
//! streaming
//!
//! Provides /_health, /metrics, and a catch-all object handler for
//! `GET|HEAD /{tag}/{path...}`.

use crate::metrics::{self, Metrics};
use crate::overrides::{split_upstream_tag, OverrideConfig};
use crate::shape::shape_response;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use gdrive_client::DriveClient;
use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub drive: DriveClient,
    pub overrides: HashMap<String, OverrideConfig>,
    pub default_root_id: String,
    pub metrics: Metrics,
    pub http: reqwest::Client,
}

impl ServerState {
    pub fn new(
        drive: DriveClient,
        overrides: HashMap<String, OverrideConfig>,
        default_root_id: String,
    ) -> Self {
        Self {
            drive,
            overrides,
            default_root_id,
            metrics: Metrics::new(),
            http: reqwest::Client::new(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/_health", get(health))
        .fallback(serve_object)
        .layer(middleware::from_fn_with_state(state.clone(), metrics::track))
        // Registered after the layer so scrapes don't count themselves.
        .route("/metrics", get(serve_metrics))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, addr: SocketAddr) -> std::io::Result<()> {
    let router = create_router(state);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Liveness check
async fn health() -> &'static str {
    "ok"
}

/// Plain-text metrics exposition
async fn serve_metrics(State(state): State<SharedState>) -> String {
    state.metrics.render()
}

/// Outcome of consulting the override table for a request.
enum OverrideOutcome {
    /// Terminal response produced by the override (redirect or proxy error)
    Response(Response),
    /// Proxied upstream response, still to be shaped and streamed
    Source(reqwest::Response),
    /// No usable override; fall through to Drive
    Miss,
}

/// Serve one object read: parse the routing tag, try an upstream override,
/// fall back to Drive resolution, and stream the shaped response.
async fn serve_object(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
) -> Response {
    if method == Method::OPTIONS {
        return preflight_response();
    }
    if method != Method::GET && method != Method::HEAD {
        return plain_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let raw_path = uri.path();
    let decoded = urlencoding::decode(raw_path)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw_path.to_string());

    let (tag, object_path) = split_upstream_tag(&decoded);
    let tag = if tag.is_empty() {
        format!("gd:{}", state.default_root_id)
    } else {
        tag.to_string()
    };
    let object_path = object_path.to_string();

    info!(method = %method, path = %decoded, tag = %tag, "serving request");

    // Directory listing is never permitted.
    if object_path.ends_with('/') {
        return plain_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let root_id = match tag.strip_prefix("gd:") {
        Some(id) => id.to_string(),
        None => state.default_root_id.clone(),
    };
    let file_name = object_path.rsplit('/').next().unwrap_or("").to_string();
    let range = request_headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Serve from the override's upstream if one is configured for this tag
    // and currently has the file. Probe failures are logged and fall through.
    if let Some(override_config) = state.overrides.get(&tag) {
        match try_override(
            &state,
            override_config,
            &object_path,
            range.as_deref(),
            &request_headers,
        )
        .await
        {
            OverrideOutcome::Response(response) => return response,
            OverrideOutcome::Source(upstream) => return shape_response(upstream, &file_name),
            OverrideOutcome::Miss => {}
        }
    }

    // Default path: resolve against Drive and stream the media.
    match state
        .drive
        .download_by_path(&object_path, range.as_deref(), &root_id)
        .await
    {
        Ok(response) if response.status().is_success() => shape_response(response, &file_name),
        Ok(response) => {
            warn!(path = %object_path, status = %response.status(), "Drive returned an error status");
            plain_response(StatusCode::NOT_FOUND, "Not found")
        }
        Err(e) => {
            warn!(path = %object_path, error = %e, "Failed to fetch object");
            plain_response(StatusCode::NOT_FOUND, "Not found")
        }
    }
}

/// Probe the override's upstream and decide between proxying and
/// redirecting.
async fn try_override(
    state: &ServerState,
    config: &OverrideConfig,
    object_path: &str,
    range: Option<&str>,
    request_headers: &HeaderMap,
) -> OverrideOutcome {
    let upstream_url = format!(
        "{}{}",
        config.upstream_url.trim_end_matches('/'),
        object_path
    );

    match state.http.head(&upstream_url).send().await {
        Ok(probe) if probe.status().is_success() => {}
        Ok(probe) => {
            warn!(url = %upstream_url, status = %probe.status(), "Upstream override probe returned an error status");
            return OverrideOutcome::Miss;
        }
        Err(e) => {
            warn!(url = %upstream_url, error = %e, "Upstream override probe failed");
            return OverrideOutcome::Miss;
        }
    }

    info!(url = %upstream_url, "Using upstream override");

    let cross_origin = request_headers
        .get("sec-fetch-mode")
        .and_then(|v| v.to_str().ok())
        == Some("cors");

    if config.must_proxy || cross_origin {
        // Proxy through this origin so the browser's CORS checks apply to
        // the gateway, not the upstream.
        let mut request = state.http.get(&upstream_url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        match request.send().await {
            Ok(response) => OverrideOutcome::Source(response),
            Err(e) => {
                warn!(url = %upstream_url, error = %e, "Failed to fetch upstream override");
                OverrideOutcome::Response(plain_response(StatusCode::NOT_FOUND, "Not found"))
            }
        }
    } else {
        OverrideOutcome::Response(redirect_response(&upstream_url))
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap()
}

fn redirect_response(location: &str) -> Response {
    let mut response = plain_response(StatusCode::FOUND, "");
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

fn preflight_response() -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET,HEAD,OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Range")
        .body(Body::empty())
        .unwrap()
}
