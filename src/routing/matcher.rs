//! Compiled, immutable route table. Literal segments take precedence over parameters.

use crate::error::ConfigError;
use crate::routing::table::{HttpVerb, RouteRule};
use crate::routing::template::{split_path, PathTemplate};
use std::collections::HashMap;

struct CompiledRule {
    rule: RouteRule,
    template: PathTemplate,
}

/// A request resolved to one rule, with its captured path parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub rule: RouteRule,
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Built once at startup and shared read-only (`Arc<RouteTable>`) across request tasks.
pub struct RouteTable {
    by_verb: HashMap<HttpVerb, Vec<CompiledRule>>,
    len: usize,
}

impl RouteTable {
    /// Compile all templates. Malformed or ambiguous rules fail here, never per request.
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, ConfigError> {
        let mut by_verb: HashMap<HttpVerb, Vec<CompiledRule>> = HashMap::new();
        let len = rules.len();
        for rule in rules {
            let template = PathTemplate::parse(rule.path_pattern)?;
            let bucket = by_verb.entry(rule.method).or_default();
            if let Some(existing) = bucket.iter().find(|c| c.template.shape() == template.shape()) {
                return Err(ConfigError::AmbiguousRoute {
                    first: existing.rule.to_string(),
                    second: rule.to_string(),
                });
            }
            bucket.push(CompiledRule { rule, template });
        }
        for bucket in by_verb.values_mut() {
            // Most specific first; stable so declaration order breaks remaining ties.
            bucket.sort_by(|a, b| b.template.specificity().cmp(&a.template.specificity()));
        }
        tracing::debug!(rules = len, "compiled route table");
        Ok(RouteTable { by_verb, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolve a request. `None` is the not-found outcome.
    pub fn match_route(&self, verb: HttpVerb, path: &str) -> Option<RouteMatch> {
        let parts = split_path(path);
        let bucket = self.by_verb.get(&verb)?;
        bucket.iter().find_map(|c| {
            c.template.captures(&parts).map(|params| RouteMatch {
                rule: c.rule.clone(),
                params,
            })
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &RouteRule> {
        self.by_verb.values().flat_map(|b| b.iter().map(|c| &c.rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::table::{api_rules, ResourceOperation};

    fn table() -> RouteTable {
        RouteTable::new(api_rules()).unwrap()
    }

    #[test]
    fn api_table_compiles() {
        let t = table();
        assert_eq!(t.len(), api_rules().len());
        assert_eq!(t.rules().count(), t.len());
    }

    #[test]
    fn literal_wins_over_parameter() {
        let m = table().match_route(HttpVerb::Get, "/bets/stats").unwrap();
        assert_eq!(m.rule.operation, ResourceOperation::CustomAction("stats"));
        assert!(m.params.is_empty());

        let m = table().match_route(HttpVerb::Get, "/bets/17").unwrap();
        assert_eq!(m.rule.operation, ResourceOperation::Read);
        assert_eq!(m.param("bet"), Some("17"));
    }

    #[test]
    fn precedence_does_not_depend_on_declaration_order() {
        let mut rules = api_rules();
        rules.reverse();
        let t = RouteTable::new(rules).unwrap();
        let m = t.match_route(HttpVerb::Get, "/transactions/stats").unwrap();
        assert_eq!(m.rule.name(), "transactions.stats");
    }

    #[test]
    fn unregistered_path_is_no_match() {
        assert!(table().match_route(HttpVerb::Get, "/nonexistent").is_none());
        assert!(table().match_route(HttpVerb::Get, "/").is_none());
    }

    #[test]
    fn verb_is_part_of_the_match() {
        let t = table();
        assert!(t.match_route(HttpVerb::Delete, "/bets/stats").is_some());
        assert!(t.match_route(HttpVerb::Post, "/bets/stats").is_none());
        assert!(t.match_route(HttpVerb::Delete, "/countries").is_none());
    }

    #[test]
    fn put_and_patch_both_update() {
        let t = table();
        for verb in [HttpVerb::Put, HttpVerb::Patch] {
            let m = t.match_route(verb, "/events/3").unwrap();
            assert_eq!(m.rule.operation, ResourceOperation::Update);
            assert_eq!(m.param("event"), Some("3"));
        }
    }

    #[test]
    fn nested_parameters_and_search_literals() {
        let t = table();
        let m = t.match_route(HttpVerb::Get, "/sports/5/leagues/search").unwrap();
        assert_eq!(m.rule.name(), "leagues.search_by_sport");
        assert_eq!(m.param("sportId"), Some("5"));

        let m = t.match_route(HttpVerb::Get, "/teams/logos/status").unwrap();
        assert_eq!(m.rule.name(), "team_logos.status");

        let m = t.match_route(HttpVerb::Get, "/teams/9/logo/download").unwrap();
        assert_eq!(m.rule.name(), "team_logos.download");
        assert_eq!(m.param("teamId"), Some("9"));
    }

    #[test]
    fn case_sensitive_and_trailing_slash() {
        let t = table();
        assert!(t.match_route(HttpVerb::Get, "/Bets").is_none());
        assert_eq!(
            t.match_route(HttpVerb::Get, "/bets/").map(|m| m.rule.operation),
            Some(ResourceOperation::List)
        );
    }

    #[test]
    fn ambiguous_rules_fail_at_build() {
        let rules = vec![
            RouteRule::new(HttpVerb::Get, "/a/{x}", "a", ResourceOperation::Read),
            RouteRule::new(HttpVerb::Get, "/a/{y}", "a", ResourceOperation::CustomAction("other")),
        ];
        assert!(matches!(RouteTable::new(rules), Err(ConfigError::AmbiguousRoute { .. })));
    }

    #[test]
    fn malformed_template_fails_at_build() {
        let rules = vec![RouteRule::new(HttpVerb::Get, "/a/{x", "a", ResourceOperation::Read)];
        assert!(matches!(RouteTable::new(rules), Err(ConfigError::MalformedTemplate { .. })));
    }

    #[test]
    fn specificity_prefers_earliest_literal() {
        let rules = vec![
            RouteRule::new(HttpVerb::Get, "/{a}/x", "r", ResourceOperation::CustomAction("param_first")),
            RouteRule::new(HttpVerb::Get, "/y/{b}", "r", ResourceOperation::CustomAction("literal_first")),
        ];
        let t = RouteTable::new(rules).unwrap();
        let m = t.match_route(HttpVerb::Get, "/y/x").unwrap();
        assert_eq!(m.rule.operation, ResourceOperation::CustomAction("literal_first"));
    }
}
