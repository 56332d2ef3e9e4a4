//! HTTP surface of the tracking number service.
//!
//! ## Structure
//!
//! - [`handler`] - route handlers.
//! - [`request`] - query parameters and their validation.

pub mod handler;
pub mod request;

use std::sync::Arc;

use axum::{Router, http::Method, middleware, routing::get};
use rangeid::{CounterStore, Issuer};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};

use crate::server::{error::handle_panic, trace::trace_requests};

/// State shared by every request: the issuer wrapping this instance's range
/// allocator.
pub struct AppState<S>
where
    S: CounterStore,
{
    pub issuer: Arc<Issuer<S>>,
}

impl<S> AppState<S>
where
    S: CounterStore,
{
    pub fn new(issuer: Issuer<S>) -> Self {
        Self {
            issuer: Arc::new(issuer),
        }
    }
}

impl<S> Clone for AppState<S>
where
    S: CounterStore,
{
    fn clone(&self) -> Self {
        Self {
            issuer: Arc::clone(&self.issuer),
        }
    }
}

/// Builds the application router.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: CounterStore + 'static,
{
    let routes = Router::new()
        .route(
            "/next-tracking-number",
            get(handler::next_tracking_number::<S>),
        )
        .route("/health", get(handler::health));

    with_middleware(routes).with_state(state)
}

/// Wraps `router` in trace ids, panic recovery and CORS, outermost first.
fn with_middleware<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(trace_requests))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET])
                    .allow_headers(Any),
            ),
    )
}
