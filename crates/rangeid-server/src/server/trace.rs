//! Per-request trace ids.
//!
//! Every request runs inside an `info` span carrying its trace id, taken from
//! the `X-Trace-Id` header or generated when the caller sent none. The id is
//! echoed back on the response so callers can correlate their logs with ours.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

pub static TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// The trace id of the current request, available to handlers as a request
/// extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(pub String);

pub async fn trace_requests(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(&TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(generate_trace_id, str::to_owned);

    let method = req.method().clone();
    let uri = req.uri().to_string();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let span = tracing::info_span!("request", trace_id = %trace_id);
    async move {
        tracing::info!("Incoming request: {method} {uri}");

        let mut res = next.run(req).await;

        tracing::info!(
            "Outgoing response: {method} {} - Path: {uri}",
            res.status().as_u16()
        );
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            res.headers_mut().insert(TRACE_ID_HEADER.clone(), value);
        }
        res
    }
    .instrument(span)
    .await
}

/// A random id in the canonical UUIDv4 text form.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
