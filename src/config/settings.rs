//! Runtime settings from environment variables (after `.env` is loaded).

use crate::access::{AccessPolicy, BearerTokenGate, PublicEndpoints};
use crate::environment::{EnvironmentResolver, SignalProvider, SystemSignals};
use crate::error::ConfigError;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "bet_tracker";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// `DATABASE_URL`, used verbatim when set; overrides the discrete fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                reason: e.to_string(),
            });
        }
        let mut opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username);
        if let Some(password) = &self.password {
            opts = opts.password(password);
        }
        Ok(opts)
    }

    /// Connection target for logs; never includes credentials.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub http_host: String,
    pub http_port: u16,
    pub database: DatabaseSettings,
    pub api_token: Option<String>,
    /// Resources guarded by `API_TOKEN`; `None` guards every non-public route.
    pub api_token_resources: Option<Vec<String>>,
    pub seed_demo_data: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary lookup. Without `DB_HOST`, container detection reads its
    /// env vars through `lookup` too; the marker, cgroup and hostname files still come from
    /// this machine. Use [`Settings::from_lookup_with`] to inject those as well.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolver = EnvironmentResolver::new(LookupSignals {
            lookup: &lookup,
            files: SystemSignals::new(),
        });
        Self::from_lookup_with(&lookup, &resolver)
    }

    pub fn from_lookup_with<F, P>(lookup: F, resolver: &EnvironmentResolver<P>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        P: SignalProvider,
    {
        // Empty values behave as unset, matching `KEY=` lines in .env files.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = match get("DB_HOST") {
            Some(h) => h,
            None => resolver.resolve_database_host().to_string(),
        };
        let database = DatabaseSettings {
            url: get("DATABASE_URL"),
            host,
            port: parse_or("DB_PORT", get("DB_PORT"), DEFAULT_DB_PORT)?,
            database: get("DB_DATABASE").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            username: get("DB_USERNAME").unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
            password: get("DB_PASSWORD"),
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS)?,
        };
        if database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }
        let api_token_resources = match get("API_TOKEN_RESOURCES") {
            None => None,
            Some(v) => {
                let resources: Vec<String> = v
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if resources.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "API_TOKEN_RESOURCES",
                        reason: format!("{:?} names no resources", v),
                    });
                }
                Some(resources)
            }
        };
        Ok(Settings {
            http_host: get("HTTP_HOST").unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string()),
            http_port: parse_or("HTTP_PORT", get("HTTP_PORT"), DEFAULT_HTTP_PORT)?,
            database,
            api_token: get("API_TOKEN"),
            api_token_resources,
            seed_demo_data: parse_bool("SEED_DEMO_DATA", get("SEED_DEMO_DATA"))?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Bearer-token gate when `API_TOKEN` is set, otherwise open access.
    pub fn access_policy(&self) -> AccessPolicy {
        let Some(token) = &self.api_token else {
            return AccessPolicy::open();
        };
        let mut gate = BearerTokenGate::new(token.clone());
        if let Some(resources) = &self.api_token_resources {
            gate = gate.only_resources(resources.iter().cloned());
        }
        AccessPolicy::new(PublicEndpoints::default(), Arc::new(gate))
    }
}

/// System signal files with env vars taken from a settings lookup.
struct LookupSignals<'a, F> {
    lookup: &'a F,
    files: SystemSignals,
}

impl<F> SignalProvider for LookupSignals<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn marker_file_exists(&self) -> bool {
        self.files.marker_file_exists()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn hostname(&self) -> Option<String> {
        self.files.hostname()
    }

    fn cgroup_contents(&self) -> Option<String> {
        self.files.cgroup_contents()
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("{:?}: {}", v, e),
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") | Some("off") => Ok(false),
        Some("true") | Some("1") | Some("yes") | Some("on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::fixtures::FixedSignals;
    use crate::routing::{api_rules, HttpVerb, RouteTable};
    use axum::http::HeaderMap;
    use std::collections::HashMap;

    fn resolver(marker: bool) -> EnvironmentResolver<FixedSignals> {
        EnvironmentResolver::new(FixedSignals {
            marker,
            vars: HashMap::new(),
            hostname: None,
            cgroup: None,
        })
    }

    fn settings(pairs: &[(&str, &str)], in_container: bool) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup_with(|k| env.get(k).cloned(), &resolver(in_container))
    }

    #[test]
    fn defaults_on_the_host() {
        let s = settings(&[], false).unwrap();
        assert_eq!(s.bind_addr(), "0.0.0.0:8000");
        assert_eq!(s.database.host, "127.0.0.1");
        assert_eq!(s.database.port, 5432);
        assert_eq!(s.database.database, "bet_tracker");
        assert_eq!(s.database.username, "postgres");
        assert_eq!(s.database.password, None);
        assert_eq!(s.database.max_connections, 5);
        assert!(!s.seed_demo_data);
        assert_eq!(s.database.describe(), "127.0.0.1:5432/bet_tracker");
    }

    #[test]
    fn container_uses_host_gateway() {
        let s = settings(&[], true).unwrap();
        assert_eq!(s.database.host, "host.docker.internal");
    }

    #[test]
    fn explicit_host_wins_over_detection() {
        let s = settings(&[("DB_HOST", "db"), ("DB_HOST_IGNORED", "x")], true).unwrap();
        assert_eq!(s.database.host, "db");
        let s = settings(&[("DB_HOST", "  ")], true).unwrap();
        assert_eq!(s.database.host, "host.docker.internal");
    }

    #[test]
    fn overrides_and_parsing() {
        let s = settings(
            &[
                ("HTTP_PORT", "9000"),
                ("DB_PORT", "6543"),
                ("DB_PASSWORD", "pw"),
                ("DB_MAX_CONNECTIONS", "12"),
                ("SEED_DEMO_DATA", "TRUE"),
                ("API_TOKEN_RESOURCES", "bets, transactions,,"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(s.http_port, 9000);
        assert_eq!(s.database.port, 6543);
        assert_eq!(s.database.password.as_deref(), Some("pw"));
        assert_eq!(s.database.max_connections, 12);
        assert!(s.seed_demo_data);
        assert_eq!(
            s.api_token_resources,
            Some(vec!["bets".to_string(), "transactions".to_string()])
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            settings(&[("HTTP_PORT", "eighty")], false),
            Err(ConfigError::Invalid { key: "HTTP_PORT", .. })
        ));
        assert!(matches!(
            settings(&[("DB_MAX_CONNECTIONS", "0")], false),
            Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            settings(&[("SEED_DEMO_DATA", "maybe")], false),
            Err(ConfigError::Invalid { key: "SEED_DEMO_DATA", .. })
        ));
    }

    #[test]
    fn token_resources_must_name_something() {
        for raw in [",", " , ,"] {
            assert!(matches!(
                settings(&[("API_TOKEN", "t0k"), ("API_TOKEN_RESOURCES", raw)], false),
                Err(ConfigError::Invalid { key: "API_TOKEN_RESOURCES", .. })
            ));
        }
        let s = settings(&[("API_TOKEN", "t0k"), ("API_TOKEN_RESOURCES", "")], false).unwrap();
        assert_eq!(s.api_token_resources, None);
    }

    #[test]
    fn lookup_supplies_container_env_vars() {
        let env: HashMap<&str, &str> = [("DOCKER_CONTAINER", "1")].into_iter().collect();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.database.host, "host.docker.internal");
    }

    #[test]
    fn database_url_is_used_verbatim() {
        let s = settings(&[("DATABASE_URL", "postgres://u:p@db:5433/bets")], false).unwrap();
        assert_eq!(s.database.describe(), "DATABASE_URL");
        let opts = s.database.connect_options().unwrap();
        assert_eq!(opts.get_host(), "db");
        assert_eq!(opts.get_port(), 5433);
        assert_eq!(opts.get_database(), Some("bets"));

        let bad = settings(&[("DATABASE_URL", "not a url")], false).unwrap();
        assert!(bad.database.connect_options().is_err());
    }

    #[test]
    fn access_policy_follows_token() {
        let table = RouteTable::new(api_rules()).unwrap();
        let bets = table.match_route(HttpVerb::Get, "/bets").unwrap().rule;
        let open = settings(&[], false).unwrap().access_policy();
        assert!(open.authorize(&bets, &HeaderMap::new()).is_ok());

        let gated = settings(&[("API_TOKEN", "t0k")], false).unwrap().access_policy();
        assert!(gated.authorize(&bets, &HeaderMap::new()).is_err());

        let partial = settings(&[("API_TOKEN", "t0k"), ("API_TOKEN_RESOURCES", "transactions")], false)
            .unwrap()
            .access_policy();
        assert!(partial.authorize(&bets, &HeaderMap::new()).is_ok());
    }
}
