//! Router assembly.

mod common;

pub use common::common_routes;

use crate::handlers::{dispatch, MAX_BODY_BYTES};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::{middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Full application: operational routes, then every `/api/...` request through the dispatcher.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .fallback(dispatch)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_id_layer))
        .with_state(state)
}
