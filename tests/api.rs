//! Drives the full axum router against a stub executor.
//!
//! Run with: cargo test --test api

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bet_tracker::{
    app, build_route_table, AccessPolicy, ApiResponse, AppError, AppState, BearerTokenGate, Catalog,
    Invocation, OperationExecutor, PublicEndpoints,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Echoes the resolved invocation instead of touching a database.
struct EchoExecutor {
    healthy: bool,
}

#[async_trait]
impl OperationExecutor for EchoExecutor {
    async fn execute(&self, inv: &Invocation) -> Result<ApiResponse, AppError> {
        if inv.rule.resource == "auth" {
            return Err(AppError::NotImplemented(inv.rule.name()));
        }
        Ok(ApiResponse::ok(json!({
            "route": inv.rule.name(),
            "params": inv.params,
            "query": inv.query,
            "lists": inv.lists,
            "body": inv.body,
        })))
    }

    async fn ping(&self) -> Result<(), AppError> {
        if self.healthy {
            Ok(())
        } else {
            Err(AppError::Db(sqlx::Error::PoolTimedOut))
        }
    }
}

fn router_with(access: AccessPolicy, healthy: bool) -> Router {
    let routes = build_route_table(&Catalog::builtin().unwrap()).unwrap();
    app(AppState::new(routes, access, Arc::new(EchoExecutor { healthy })))
}

fn router() -> Router {
    router_with(AccessPolicy::open(), true)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn literal_action_beats_member_route() {
    let (status, body) = send(router(), get("/api/bets/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "bets.stats");

    let (_, body) = send(router(), get("/api/bets/17")).await;
    assert_eq!(body["route"], "bets.read");
    assert_eq!(body["params"], json!({"bet": "17"}));
}

#[tokio::test]
async fn trailing_slash_is_ignored() {
    let (status, body) = send(router(), get("/api/bets/detailed-stats/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "bets.detailed_stats");
}

#[tokio::test]
async fn nested_sport_routes_capture_ids() {
    let (_, body) = send(router(), get("/api/sports/4/teams/search?search=ly&page=2")).await;
    assert_eq!(body["route"], "teams.search_by_sport");
    assert_eq!(body["params"], json!({"sportId": "4"}));
    assert_eq!(body["query"], json!({"search": "ly", "page": "2"}));

    let (_, body) = send(router(), get("/api/teams/logos/status")).await;
    assert_eq!(body["route"], "team_logos.status");

    let (_, body) = send(router(), get("/api/teams/9/logo/download")).await;
    assert_eq!(body["route"], "team_logos.download");
}

#[tokio::test]
async fn repeated_query_keys_are_collected() {
    let uri = "/api/bets/stats?sports%5B%5D=football&sports%5B%5D=tennis&bet_types=SIMPLE,COMBO&period=7j";
    let (status, body) = send(router(), get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lists"]["sports"], json!(["football", "tennis"]));
    assert_eq!(body["lists"]["bet_types"], json!(["SIMPLE", "COMBO"]));
    assert_eq!(body["query"]["period"], "7j");
}

#[tokio::test]
async fn unknown_paths_are_json_404() {
    for uri in ["/api/nonexistent", "/api", "/bets/stats", "/api/bets/1/extra"] {
        let (status, body) = send(router(), get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"]["code"], "not_found", "{}", uri);
    }
}

#[tokio::test]
async fn unmapped_verbs_are_404() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/bets")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/countries")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn json_body_reaches_the_executor() {
    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/api/transactions/3")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"amount": 42.5}"#))
        .unwrap();
    let (status, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "transactions.update");
    assert_eq!(body["body"], json!({"amount": 42.5}));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/bets")
        .body(Body::from("{stake"))
        .unwrap();
    let (status, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn executor_errors_use_the_envelope() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "not_implemented");
}

#[tokio::test]
async fn token_gate_spares_public_endpoints() {
    let gated = || {
        router_with(
            AccessPolicy::new(PublicEndpoints::default(), Arc::new(BearerTokenGate::new("s3cret"))),
            true,
        )
    };

    let (status, body) = send(gated(), get("/api/bets")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let request = Request::builder()
        .uri("/api/bets")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(gated(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "bets.list");

    let (status, body) = send(gated(), get("/api/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "system.test");

    // Unknown routes stay 404 regardless of the gate.
    let (status, _) = send(gated(), get("/api/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn operational_routes() {
    let (status, body) = send(router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = send(router(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let (status, body) = send(router_with(AccessPolicy::open(), false), get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");

    let (_, body) = send(router(), get("/version")).await;
    assert_eq!(body["name"], "bet-tracker");
}
