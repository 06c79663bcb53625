//! Bet tracker: REST backend for a personal sports-betting tracker.
//!
//! Requests under `/api` are resolved through a static [`RouteTable`] to a
//! resource operation, passed through the [`AccessPolicy`], and executed by
//! an [`OperationExecutor`] (PostgreSQL in production). The database host is
//! chosen by the [`environment`] resolver, which detects containers.

pub mod access;
pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod routing;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;

pub use access::{AccessGate, AccessPolicy, BearerTokenGate, OpenAccess, PublicEndpoints};
pub use catalog::Catalog;
pub use config::Settings;
pub use environment::{is_containerized, resolve_database_host, EnvironmentResolver};
pub use error::{AppError, ConfigError};
pub use executor::{ApiResponse, Invocation, OperationExecutor, PgExecutor};
pub use routes::app;
pub use routing::{api_rules, HttpVerb, ResourceOperation, RouteMatch, RouteRule, RouteTable};
pub use state::AppState;

/// Route table for the API, checked against the catalog.
pub fn build_route_table(catalog: &Catalog) -> Result<RouteTable, ConfigError> {
    let rules = api_rules();
    catalog::validate_routes(&catalog.entities, &rules)?;
    RouteTable::new(rules)
}
