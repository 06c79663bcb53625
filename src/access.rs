//! Access control in front of matched routes.
//!
//! Authorization runs after matching, so a gate never changes which rule a
//! request resolves to. A short, named list of endpoints is always public and
//! bypasses the gate. Everything else goes through the configured
//! [`AccessGate`], which is [`OpenAccess`] until authentication is enforced.

use crate::error::AppError;
use crate::routing::{HttpVerb, RouteRule};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashSet;
use std::sync::Arc;

/// Endpoints that never pass through the gate.
pub const PUBLIC_ENDPOINTS: &[(HttpVerb, &str)] = &[
    (HttpVerb::Post, "/register"),
    (HttpVerb::Post, "/login"),
    (HttpVerb::Get, "/test"),
];

#[derive(Clone, Debug)]
pub struct PublicEndpoints {
    entries: HashSet<(HttpVerb, &'static str)>,
}

impl PublicEndpoints {
    pub fn new(entries: &[(HttpVerb, &'static str)]) -> Self {
        PublicEndpoints {
            entries: entries.iter().copied().collect(),
        }
    }

    pub fn contains(&self, rule: &RouteRule) -> bool {
        self.entries.contains(&(rule.method, rule.path_pattern))
    }
}

impl Default for PublicEndpoints {
    fn default() -> Self {
        Self::new(PUBLIC_ENDPOINTS)
    }
}

pub trait AccessGate: Send + Sync {
    /// Whether this gate guards `rule`. Rules it does not guard are admitted.
    fn applies_to(&self, _rule: &RouteRule) -> bool {
        true
    }

    fn check(&self, rule: &RouteRule, headers: &HeaderMap) -> Result<(), AppError>;
}

/// Admits every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAccess;

impl AccessGate for OpenAccess {
    fn check(&self, _rule: &RouteRule, _headers: &HeaderMap) -> Result<(), AppError> {
        Ok(())
    }
}

/// Requires `Authorization: Bearer <token>` matching a configured static token.
#[derive(Clone, Debug)]
pub struct BearerTokenGate {
    token: String,
    resources: Option<HashSet<String>>,
}

impl BearerTokenGate {
    pub fn new(token: impl Into<String>) -> Self {
        BearerTokenGate {
            token: token.into(),
            resources: None,
        }
    }

    /// Only guard routes whose resource is in `resources`.
    pub fn only_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl AccessGate for BearerTokenGate {
    fn applies_to(&self, rule: &RouteRule) -> bool {
        self.resources
            .as_ref()
            .map(|set| set.contains(rule.resource))
            .unwrap_or(true)
    }

    fn check(&self, _rule: &RouteRule, headers: &HeaderMap) -> Result<(), AppError> {
        match bearer_token(headers) {
            Some(t) if t == self.token => Ok(()),
            Some(_) => Err(AppError::Unauthorized("invalid token".into())),
            None => Err(AppError::Unauthorized("missing bearer token".into())),
        }
    }
}

#[derive(Clone)]
pub struct AccessPolicy {
    public: PublicEndpoints,
    gate: Arc<dyn AccessGate>,
}

impl AccessPolicy {
    pub fn new(public: PublicEndpoints, gate: Arc<dyn AccessGate>) -> Self {
        AccessPolicy { public, gate }
    }

    /// Public endpoints plus [`OpenAccess`] for everything else.
    pub fn open() -> Self {
        Self::new(PublicEndpoints::default(), Arc::new(OpenAccess))
    }

    pub fn authorize(&self, rule: &RouteRule, headers: &HeaderMap) -> Result<(), AppError> {
        if self.public.contains(rule) || !self.gate.applies_to(rule) {
            return Ok(());
        }
        let result = self.gate.check(rule, headers);
        if let Err(e) = &result {
            tracing::info!(route = %rule, error = %e, "access denied");
        }
        result
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::open()
    }
}
