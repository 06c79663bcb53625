//! Path templates: `/sports/{sportId}/leagues` compiled into literal and parameter segments.

use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

#[derive(Clone, Debug)]
pub struct PathTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

fn param_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn malformed(pattern: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedTemplate {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Split a request or template path into segments. `/` yields no segments; one trailing slash is ignored.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl PathTemplate {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        if !pattern.starts_with('/') {
            return Err(malformed(pattern, "must start with '/'"));
        }
        if pattern.len() > 1 && pattern.ends_with('/') {
            return Err(malformed(pattern, "trailing '/'"));
        }
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        for raw in split_path(pattern) {
            if raw.is_empty() {
                return Err(malformed(pattern, "empty segment"));
            }
            if let Some(inner) = raw.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .ok_or_else(|| malformed(pattern, format!("unclosed parameter in '{}'", raw)))?;
                if !param_name_re().is_match(name) {
                    return Err(malformed(pattern, format!("invalid parameter name '{}'", name)));
                }
                if !seen.insert(name.to_string()) {
                    return Err(malformed(pattern, format!("duplicate parameter '{}'", name)));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if raw.contains('{') || raw.contains('}') {
                return Err(malformed(pattern, format!("stray brace in '{}'", raw)));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        Ok(PathTemplate {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Literal/parameter layout, ignoring parameter names. Two templates with the same shape are indistinguishable.
    pub fn shape(&self) -> Vec<Option<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Param(_) => None,
            })
            .collect()
    }

    /// One flag per segment, literal = true. Compared lexicographically, greater is more specific.
    pub fn specificity(&self) -> Vec<bool> {
        self.segments.iter().map(Segment::is_literal).collect()
    }

    /// Match pre-split request segments; returns captured parameters.
    pub fn captures(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(l) => {
                    if l != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_params() {
        let t = PathTemplate::parse("/sports/{sportId}/leagues").unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("sports".into()),
                Segment::Param("sportId".into()),
                Segment::Literal("leagues".into()),
            ]
        );
        assert_eq!(t.specificity(), vec![true, false, true]);
    }

    #[test]
    fn root_has_no_segments() {
        let t = PathTemplate::parse("/").unwrap();
        assert!(t.segments().is_empty());
        assert_eq!(t.captures(&[]), Some(HashMap::new()));
    }

    #[test]
    fn rejects_malformed_templates() {
        for bad in [
            "bets",
            "/bets/",
            "/bets//stats",
            "/bets/{id",
            "/bets/{}",
            "/bets/{1id}",
            "/bets/x{id}",
            "/a/{id}/b/{id}",
        ] {
            assert!(
                matches!(PathTemplate::parse(bad), Err(ConfigError::MalformedTemplate { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn captures_are_case_sensitive_on_literals() {
        let t = PathTemplate::parse("/bets/stats").unwrap();
        assert!(t.captures(&split_path("/bets/stats")).is_some());
        assert!(t.captures(&split_path("/Bets/stats")).is_none());
    }

    #[test]
    fn params_capture_non_slash_text() {
        let t = PathTemplate::parse("/teams/{teamId}/logo/download").unwrap();
        let params = t.captures(&split_path("/teams/42/logo/download")).unwrap();
        assert_eq!(params.get("teamId").map(String::as_str), Some("42"));
        assert!(t.captures(&split_path("/teams/42/extra/logo/download")).is_none());
    }

    #[test]
    fn split_ignores_one_trailing_slash() {
        assert_eq!(split_path("/bets/"), vec!["bets"]);
        assert_eq!(split_path("/bets//"), vec!["bets", ""]);
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn empty_segment_does_not_fill_a_param() {
        let t = PathTemplate::parse("/bets/{id}/x").unwrap();
        assert!(t.captures(&split_path("/bets//x")).is_none());
    }
}
