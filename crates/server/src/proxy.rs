//! HTTP front of the engine.
//!
//! Every request lands in one fallback handler. It is captured into an
//! `InterceptedRequest`, handed to the engine, and the answer is written
//! back. Passthrough requests are forwarded upstream unmodified. Responses
//! chosen by the engine carry an `x-pantry-source` header.
//!
//! Requests are refused before the engine runs when they would loop: they
//! already carry this proxy's `Via` marker, or they name the proxy's own
//! listener under anything but the app origin. CONNECT is refused outright.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use pantry_client::fetch::{is_hop_by_hop, is_own_via, resolve_target};
use pantry_client::{Engine, Network, Outcome, RequestMode, Source};
use pantry_core::config::targets_listener;
use pantry_core::{HttpResponse, InterceptedRequest};
use tower_http::trace::TraceLayer;

use crate::error::ProxyError;

pub const SOURCE_HEADER: &str = "x-pantry-source";

/// Request bodies beyond this are rejected.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ProxyState {
    engine: Engine,
    network: Arc<dyn Network>,
    /// Scheme for origin-form targets.
    default_scheme: Arc<str>,
    /// Address the proxy is bound to.
    listen: SocketAddr,
}

impl ProxyState {
    pub fn new(
        engine: Engine, network: Arc<dyn Network>, default_scheme: impl Into<Arc<str>>, listen: SocketAddr,
    ) -> Self {
        Self { engine, network, default_scheme: default_scheme.into(), listen }
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .fallback(intercept)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn intercept(State(state): State<ProxyState>, request: Request) -> Result<Response, ProxyError> {
    if request.method() == Method::CONNECT {
        return Err(ProxyError::MethodNotAllowed(format!(
            "CONNECT {}: tunnelling is not supported",
            request.uri()
        )));
    }
    if request
        .headers()
        .get_all(header::VIA)
        .iter()
        .any(|v| v.to_str().is_ok_and(is_own_via))
    {
        return Err(ProxyError::LoopDetected(format!("{} already passed through this proxy", request.uri())));
    }

    let request = capture(request, &state.default_scheme).await?;
    if request.origin() != state.engine.settings().app_origin.origin() && targets_listener(&request.url, state.listen)
    {
        return Err(ProxyError::LoopDetected(format!("{} resolves to this proxy", request.url)));
    }

    match state.engine.handle(&request).await {
        Outcome::Respond(served) => Ok(to_response(served.response, Some(served.source))),
        Outcome::Passthrough => {
            let response = state
                .network
                .fetch(&request, RequestMode::Default)
                .await
                .map_err(|e| ProxyError::BadGateway(format!("{}: {e}", request.url)))?;
            Ok(to_response(response, None))
        }
    }
}

/// Buffer an axum request into an `InterceptedRequest`.
///
/// Origin-form targets are resolved against the `Host` header. Header
/// values that are not visible ASCII are dropped.
pub async fn capture(request: Request, default_scheme: &str) -> Result<InterceptedRequest, ProxyError> {
    let (parts, body) = request.into_parts();

    let host = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let url = resolve_target(&parts.uri.to_string(), host, default_scheme)
        .map_err(|e| ProxyError::BadRequest(e.to_string()))?;

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::BadRequest(format!("request body: {e}")))?;

    let mut captured = InterceptedRequest::new(parts.method.as_str(), url).with_body(body);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            captured = captured.with_header(name.as_str(), value);
        }
    }
    Ok(captured)
}

/// Write an `HttpResponse` back out, minus hop-by-hop headers.
pub fn to_response(response: HttpResponse, source: Option<Source>) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable response header"),
        }
    }

    if let Some(source) = source {
        headers.insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));
    }
    out
}
