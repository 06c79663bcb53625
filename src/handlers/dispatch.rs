//! Fallback handler that resolves `/api/...` requests through the route table.

use crate::error::AppError;
use crate::executor::Invocation;
use crate::routing::HttpVerb;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Query, Request, State},
    response::{IntoResponse, Response},
};
use serde_json::Value;

pub const API_PREFIX: &str = "/api";
/// Upper bound on request bodies read by the dispatcher.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Path relative to the API prefix, or `None` when the request is outside it.
pub fn strip_api_prefix(path: &str) -> Option<&str> {
    match path.strip_prefix(API_PREFIX)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

async fn read_json_body(body: Body) -> Result<Option<Value>, AppError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("request body too large or unreadable".into()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Match, authorize, then execute. Unknown paths and unsupported verbs are 404.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();
    let not_found = || AppError::NotFound(format!("{} {}", parts.method, path));

    let api_path = strip_api_prefix(path).ok_or_else(not_found)?;
    let verb = HttpVerb::from_method(&parts.method).ok_or_else(not_found)?;
    let Some(route) = state.routes.match_route(verb, api_path) else {
        tracing::debug!(method = %verb, path = %api_path, "no route");
        return Err(not_found());
    };
    tracing::debug!(route = %route.rule, "route matched");

    state.access.authorize(&route.rule, &parts.headers)?;

    // Pairs rather than a map so repeated keys (`sports[]=a&sports[]=b`) survive.
    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let body = read_json_body(body).await?;

    let invocation = Invocation::new(route).with_query_pairs(query).with_body(body);
    let response = state.executor.execute(&invocation).await?;
    Ok(response.into_response())
}
