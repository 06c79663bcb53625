//! Execution of matched routes.
//!
//! The dispatcher resolves a request to an [`Invocation`] and hands it to an
//! [`OperationExecutor`]. [`PgExecutor`] runs CRUD and custom actions against
//! PostgreSQL; tests plug in their own executor.

mod pg;

pub use pg::PgExecutor;

use crate::error::AppError;
use crate::routing::{RouteMatch, RouteRule};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// A matched request ready to execute.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub rule: RouteRule,
    pub params: HashMap<String, String>,
    /// Last value per key.
    pub query: HashMap<String, String>,
    /// Every value per key, from repeated keys and comma-separated values.
    pub lists: HashMap<String, Vec<String>>,
    pub body: Option<Value>,
}

impl Invocation {
    pub fn new(route: RouteMatch) -> Self {
        Invocation {
            rule: route.rule,
            params: route.params,
            query: HashMap::new(),
            lists: HashMap::new(),
            body: None,
        }
    }

    /// Query pairs in request order. `key[]` is stored under `key`.
    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        for (key, value) in pairs {
            let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
            let items = self.lists.entry(key.clone()).or_default();
            items.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
            self.query.insert(key, value);
        }
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The single path parameter of a member route (`/bets/{bet}`).
    pub fn member_id(&self) -> Option<&str> {
        self.params.values().next().map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_list(&self, name: &str) -> &[String] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Body as a column map; a missing body is an empty map.
    pub fn body_map(&self) -> Result<HashMap<String, Value>, AppError> {
        match &self.body {
            None => Ok(HashMap::new()),
            Some(Value::Object(m)) => Ok(m.clone().into_iter().collect()),
            Some(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }
}

/// JSON payload plus status, produced by an executor.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn created(body: Value) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            body,
        }
    }

    pub fn no_content() -> Self {
        ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: Value::Null,
        }
    }
}

impl axum::response::IntoResponse for ApiResponse {
    fn into_response(self) -> axum::response::Response {
        if self.status == StatusCode::NO_CONTENT {
            return self.status.into_response();
        }
        (self.status, axum::Json(self.body)).into_response()
    }
}

#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<ApiResponse, AppError>;

    /// Readiness probe for the backing store.
    async fn ping(&self) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{HttpVerb, ResourceOperation};
    use serde_json::json;

    fn invocation(body: Option<Value>) -> Invocation {
        let rule = RouteRule::new(HttpVerb::Put, "/bets/{bet}", "bets", ResourceOperation::Update);
        let params = [("bet".to_string(), "42".to_string())].into_iter().collect();
        Invocation::new(RouteMatch { rule, params }).with_body(body)
    }

    #[test]
    fn member_id_and_body() {
        let inv = invocation(Some(json!({"stake": 10})));
        assert_eq!(inv.member_id(), Some("42"));
        assert_eq!(inv.param("bet"), Some("42"));
        assert_eq!(inv.body_map().unwrap().get("stake"), Some(&json!(10)));
    }

    #[test]
    fn non_object_body_rejected() {
        assert!(matches!(
            invocation(Some(json!([1, 2]))).body_map(),
            Err(AppError::BadRequest(_))
        ));
        assert!(invocation(None).body_map().unwrap().is_empty());
    }

    #[test]
    fn repeated_and_comma_separated_query_values() {
        let inv = invocation(None).with_query_pairs(vec![
            ("sports[]".into(), "football".into()),
            ("sports[]".into(), "tennis".into()),
            ("bet_types".into(), "SIMPLE, COMBO,".into()),
            ("period".into(), "7j".into()),
        ]);
        assert_eq!(inv.query_list("sports"), ["football", "tennis"]);
        assert_eq!(inv.query_list("bet_types"), ["SIMPLE", "COMBO"]);
        assert!(inv.query_list("tipsters").is_empty());
        assert_eq!(inv.query("period"), Some("7j"));
        assert_eq!(inv.query("sports"), Some("tennis"));
    }
}
