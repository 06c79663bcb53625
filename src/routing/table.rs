//! Route rules and the application's static routing table.

use axum::http::Method;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(HttpVerb::Get),
            Method::POST => Some(HttpVerb::Post),
            Method::PUT => Some(HttpVerb::Put),
            Method::PATCH => Some(HttpVerb::Patch),
            Method::DELETE => Some(HttpVerb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched route asks the executor to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceOperation {
    List,
    Create,
    Read,
    Update,
    Delete,
    CustomAction(&'static str),
}

impl ResourceOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceOperation::List => "list",
            ResourceOperation::Create => "create",
            ResourceOperation::Read => "read",
            ResourceOperation::Update => "update",
            ResourceOperation::Delete => "delete",
            ResourceOperation::CustomAction(name) => *name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRule {
    pub method: HttpVerb,
    pub path_pattern: &'static str,
    pub resource: &'static str,
    pub operation: ResourceOperation,
}

impl RouteRule {
    pub const fn new(
        method: HttpVerb,
        path_pattern: &'static str,
        resource: &'static str,
        operation: ResourceOperation,
    ) -> Self {
        RouteRule {
            method,
            path_pattern,
            resource,
            operation,
        }
    }

    /// `<resource>.<operation>`, e.g. `bets.stats`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.resource, self.operation.name())
    }
}

impl fmt::Display for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.path_pattern, self.name())
    }
}

fn action(method: HttpVerb, path: &'static str, resource: &'static str, name: &'static str) -> RouteRule {
    RouteRule::new(method, path, resource, ResourceOperation::CustomAction(name))
}

/// Standard REST resource: list, create, read, update (PUT and PATCH), delete.
/// `collection` and `member` are the full patterns, e.g. `/bets` and `/bets/{bet}`.
pub fn api_resource(resource: &'static str, collection: &'static str, member: &'static str) -> Vec<RouteRule> {
    use HttpVerb::*;
    vec![
        RouteRule::new(Get, collection, resource, ResourceOperation::List),
        RouteRule::new(Post, collection, resource, ResourceOperation::Create),
        RouteRule::new(Get, member, resource, ResourceOperation::Read),
        RouteRule::new(Put, member, resource, ResourceOperation::Update),
        RouteRule::new(Patch, member, resource, ResourceOperation::Update),
        RouteRule::new(Delete, member, resource, ResourceOperation::Delete),
    ]
}

/// Every API route, relative to the `/api` prefix.
pub fn api_rules() -> Vec<RouteRule> {
    use HttpVerb::*;
    let mut rules = vec![
        action(Get, "/test", "system", "test"),
        action(Post, "/register", "auth", "register"),
        action(Post, "/login", "auth", "login"),
        action(Post, "/logout", "auth", "logout"),
        action(Get, "/bets/stats", "bets", "stats"),
        action(Get, "/bets/detailed-stats", "bets", "detailed_stats"),
        action(Get, "/bets/capital-evolution", "bets", "capital_evolution"),
        action(Get, "/bets/filter-options", "bets", "filter_options"),
    ];
    rules.extend(api_resource("bets", "/bets", "/bets/{bet}"));

    rules.push(action(Get, "/transactions/stats", "transactions", "stats"));
    rules.extend(api_resource("transactions", "/transactions", "/transactions/{transaction}"));

    rules.extend(api_resource("events", "/events", "/events/{event}"));
    rules.extend(api_resource("bookmakers", "/bookmakers", "/bookmakers/{bookmaker}"));

    rules.extend([
        RouteRule::new(Get, "/countries", "countries", ResourceOperation::List),
        action(Get, "/countries/search", "countries", "search"),
        RouteRule::new(Get, "/sports", "sports", ResourceOperation::List),
        action(Get, "/sports/{sportId}/leagues", "leagues", "by_sport"),
        action(Get, "/sports/{sportId}/leagues/search", "leagues", "search_by_sport"),
        action(Get, "/sports/{sportId}/teams", "teams", "by_sport"),
        action(Get, "/sports/{sportId}/teams/search", "teams", "search_by_sport"),
        action(Get, "/leagues/{leagueId}/teams", "teams", "by_league"),
        action(Get, "/teams/logos/status", "team_logos", "status"),
        action(Post, "/teams/logos/download-all", "team_logos", "download_all"),
        action(Get, "/teams/{teamId}/logo/download", "team_logos", "download"),
    ]);
    rules
}
