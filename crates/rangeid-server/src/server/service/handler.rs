use std::time::Instant;

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{SecondsFormat, Utc};
use rangeid::CounterStore;
use serde::{Deserialize, Serialize};

use crate::server::{
    error::ApiError,
    service::{
        AppState,
        request::{TrackingQuery, TrackingRequest},
    },
    telemetry::{
        increment_bad_requests, increment_generation_errors, increment_ids_issued,
        increment_requests, record_request_duration,
    },
    trace::TraceId,
};

/// Body of a successful `GET /next-tracking-number`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackingResponse {
    pub tracking_number: String,
    pub created_at: String,
}

/// Validates the query and issues the next tracking number.
pub async fn next_tracking_number<S>(
    State(state): State<AppState<S>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    query: Result<Query<TrackingQuery>, QueryRejection>,
) -> Result<Json<TrackingResponse>, ApiError>
where
    S: CounterStore + 'static,
{
    let start = Instant::now();
    increment_requests();

    let res = issue(&state, &trace_id, query).await;
    match &res {
        Ok(_) => increment_ids_issued(),
        Err(ApiError::BadRequest(_)) => increment_bad_requests(),
        Err(_) => increment_generation_errors(),
    }
    record_request_duration(start.elapsed().as_secs_f64() * 1000.0);

    if let Ok(Json(body)) = &res {
        tracing::info!("Generated tracking number: {}", body.tracking_number);
    }
    res
}

async fn issue<S>(
    state: &AppState<S>,
    trace_id: &str,
    query: Result<Query<TrackingQuery>, QueryRejection>,
) -> Result<Json<TrackingResponse>, ApiError>
where
    S: CounterStore + 'static,
{
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let req = TrackingRequest::try_from(query)?;
    tracing::debug!(
        "Issuing tracking number for {} ({} -> {}), trace {trace_id}",
        req.customer_slug,
        req.origin_country_id,
        req.destination_country_id
    );

    let issued = state.issuer.issue().await?;
    Ok(Json(TrackingResponse {
        tracking_number: issued.code,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }))
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "OK"
}
