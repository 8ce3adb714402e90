use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Instrument;

/// Probes hit every few seconds; keep them out of the info stream.
fn is_probe(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// One span per request carrying its id, so handler and auth logs
/// (login failures, denials) can be tied back to the request.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = tracing::info_span!("request", request_id = %req_id, method = %method, path = %path);
    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    span.in_scope(|| {
        if status.is_server_error() {
            tracing::error!(status = %status, duration_ms, "request completed with error");
        } else if status.is_client_error() {
            tracing::warn!(status = %status, duration_ms, "request completed with client error");
        } else if is_probe(&path) {
            tracing::debug!(status = %status, duration_ms, "probe completed");
        } else {
            tracing::info!(status = %status, duration_ms, "request completed");
        }
    });

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
