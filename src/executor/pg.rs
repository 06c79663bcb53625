//! PostgreSQL-backed executor: generic CRUD plus the custom betting actions.

use crate::catalog::{Catalog, EntityOperation, PkType, ResolvedEntity};
use crate::error::AppError;
use crate::executor::{ApiResponse, Invocation, OperationExecutor};
use crate::response::{success_created, success_many, success_one, success_page, Pagination};
use crate::routing::ResourceOperation;
use crate::service::stats::{self, BetRecord};
use crate::service::{CrudService, RequestValidator};
use crate::sql::{self, DateRange, ListQuery, Within};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

const SEARCH_DEFAULT_LIMIT: u32 = 30;
const SEARCH_MAX_LIMIT: u32 = 50;

/// Query keys with their own meaning; never treated as column filters.
const RESERVED_QUERY_KEYS: &[&str] = &[
    "limit",
    "offset",
    "page",
    "search",
    "period",
    "start_date",
    "end_date",
    "initial_capital",
    "sports",
    "bet_types",
    "bookmakers",
    "tipsters",
];

/// List filters on the statistics actions that all narrow by `bet_code`.
const BET_CODE_FILTERS: [&str; 3] = ["bet_types", "bookmakers", "tipsters"];

pub struct PgExecutor {
    pool: PgPool,
    catalog: Arc<Catalog>,
}

impl PgExecutor {
    pub fn new(pool: PgPool, catalog: Catalog) -> Self {
        PgExecutor {
            pool,
            catalog: Arc::new(catalog),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn entity(&self, resource: &str) -> Result<&ResolvedEntity, AppError> {
        self.catalog
            .entity(resource)
            .ok_or_else(|| AppError::NotFound(format!("resource {}", resource)))
    }

    async fn crud(&self, inv: &Invocation) -> Result<ApiResponse, AppError> {
        let entity = self.entity(inv.rule.resource)?;
        match inv.rule.operation {
            ResourceOperation::List => {
                require(entity, EntityOperation::Read)?;
                let list = list_query(entity, &inv.query);
                let rows = CrudService::list(&self.pool, entity, &list).await?;
                Ok(success_many(rows))
            }
            ResourceOperation::Create => {
                require(entity, EntityOperation::Create)?;
                let body = inv.body_map()?;
                RequestValidator::validate(&body, &entity.validation)?;
                let row = CrudService::create(&self.pool, entity, &body).await?;
                Ok(success_created(row))
            }
            ResourceOperation::Read => {
                require(entity, EntityOperation::Read)?;
                let (id, raw) = member_id(inv, entity)?;
                let row = CrudService::read(&self.pool, entity, &id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(raw.to_string()))?;
                Ok(success_one(row))
            }
            ResourceOperation::Update => {
                require(entity, EntityOperation::Update)?;
                let (id, raw) = member_id(inv, entity)?;
                let body = inv.body_map()?;
                RequestValidator::validate_partial(&body, &entity.validation)?;
                let row = CrudService::update(&self.pool, entity, &id, &body)
                    .await?
                    .ok_or_else(|| AppError::NotFound(raw.to_string()))?;
                Ok(success_one(row))
            }
            ResourceOperation::Delete => {
                require(entity, EntityOperation::Delete)?;
                let (id, raw) = member_id(inv, entity)?;
                CrudService::delete(&self.pool, entity, &id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(raw.to_string()))?;
                Ok(ApiResponse::no_content())
            }
            ResourceOperation::CustomAction(name) => self.action(inv, name).await,
        }
    }

    async fn action(&self, inv: &Invocation, name: &str) -> Result<ApiResponse, AppError> {
        match (inv.rule.resource, name) {
            ("system", "test") => Ok(ApiResponse::ok(json!({
                "success": true,
                "message": "API is working"
            }))),
            ("auth", _) | ("team_logos", "download") | ("team_logos", "download_all") => {
                Err(AppError::NotImplemented(inv.rule.name()))
            }
            ("bets", "stats") => {
                let bets = self.bets(inv).await?;
                Ok(success_one(stats::bet_stats(&bets)))
            }
            ("bets", "detailed_stats") => {
                let bets = self.bets(inv).await?;
                Ok(success_one(stats::detailed_stats(&bets)))
            }
            ("bets", "capital_evolution") => {
                let initial = match inv.query("initial_capital") {
                    Some(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| AppError::BadRequest(format!("invalid initial_capital: {}", s)))?,
                    None => stats::DEFAULT_INITIAL_CAPITAL,
                };
                let bets = self.bets(inv).await?;
                let today = Utc::now().date_naive();
                Ok(success_one(stats::capital_evolution(&bets, initial, today)))
            }
            ("bets", "filter_options") => self.filter_options().await,
            ("transactions", "stats") => self.transaction_stats(inv).await,
            ("countries", "search") => self.search(inv, "countries", ListQuery::default()).await,
            ("leagues", "search_by_sport") => {
                let mut list = ListQuery {
                    filters: vec![("sport_id".into(), path_id(inv, "sportId")?)],
                    ..Default::default()
                };
                push_optional_filter(&mut list, inv, "country_id")?;
                self.search(inv, "leagues", list).await
            }
            ("teams", "search_by_sport") => {
                let mut list = ListQuery {
                    within: Some(self.teams_of_sport(inv)?),
                    ..Default::default()
                };
                push_optional_filter(&mut list, inv, "league_id")?;
                self.search(inv, "teams", list).await
            }
            ("leagues", "by_sport") => {
                let list = ListQuery {
                    filters: vec![("sport_id".into(), path_id(inv, "sportId")?)],
                    ..Default::default()
                };
                self.listing("leagues", &list).await
            }
            ("teams", "by_sport") => {
                let list = ListQuery {
                    within: Some(self.teams_of_sport(inv)?),
                    ..Default::default()
                };
                self.listing("teams", &list).await
            }
            ("teams", "by_league") => {
                let list = ListQuery {
                    filters: vec![("league_id".into(), path_id(inv, "leagueId")?)],
                    ..Default::default()
                };
                self.listing("teams", &list).await
            }
            ("team_logos", "status") => self.logo_status().await,
            _ => Err(AppError::NotFound(format!("action {}", inv.rule.name()))),
        }
    }

    fn teams_of_sport(&self, inv: &Invocation) -> Result<Within, AppError> {
        let leagues = self.entity("leagues")?;
        Ok(Within::new("league_id", leagues, "sport_id", path_id(inv, "sportId")?))
    }

    /// Unpaged listing in the entity's natural order.
    async fn listing(&self, resource: &str, list: &ListQuery) -> Result<ApiResponse, AppError> {
        let entity = self.entity(resource)?;
        let rows = CrudService::fetch_all(&self.pool, &sql::select_list(entity, list)).await?;
        Ok(success_many(rows))
    }

    async fn search(&self, inv: &Invocation, resource: &str, mut list: ListQuery) -> Result<ApiResponse, AppError> {
        let entity = self.entity(resource)?;
        let (page, per_page) = page_params(&inv.query);
        list.search = inv
            .query("search")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let total = CrudService::count(&self.pool, entity, &list).await?;
        list.limit = Some(per_page);
        list.offset = Some((page - 1).saturating_mul(per_page));
        let rows = CrudService::fetch_all(&self.pool, &sql::select_list(entity, &list)).await?;
        Ok(success_page(rows, Pagination::new(page, per_page, total.max(0) as u64)))
    }

    /// Bets matching the request's filters, period and date bounds, oldest first.
    async fn bets(&self, inv: &Invocation) -> Result<Vec<BetRecord>, AppError> {
        let entity = self.entity("bets")?;
        let now = Utc::now();
        let period_start = inv
            .query("period")
            .and_then(|p| stats::bet_period_start(p, now));
        let start_date = inv.query("start_date").map(|s| parse_bound(s, false)).transpose()?;
        let end_date = inv.query("end_date").map(|s| parse_bound(s, true)).transpose()?;
        let start = period_start.max(start_date);
        let mut list = list_query(entity, &inv.query);
        list.limit = None;
        list.offset = None;
        apply_bet_filters(&mut list, self.entity("sports")?, inv);
        if start.is_some() || end_date.is_some() {
            list.range = Some(DateRange {
                column: "bet_date".into(),
                start: start.map(|d| Value::String(d.to_rfc3339())),
                end: end_date.map(|d| Value::String(d.to_rfc3339())),
                cast: None,
            });
        }
        let rows = CrudService::fetch_all(&self.pool, &sql::select_list(entity, &list)).await?;
        tracing::debug!(count = rows.len(), "loaded bets for statistics");
        Ok(rows.iter().map(BetRecord::from_row).collect())
    }

    async fn transaction_stats(&self, inv: &Invocation) -> Result<ApiResponse, AppError> {
        let entity = self.entity("transactions")?;
        let start = inv
            .query("period")
            .and_then(|p| stats::transaction_period_start(p, Utc::now()));
        let list = ListQuery {
            range: start.map(transactions_since),
            ..Default::default()
        };
        let rows = CrudService::fetch_all(&self.pool, &sql::select_list(entity, &list)).await?;
        let totals = stats::transaction_stats(rows.iter().map(|r| {
            (
                r.get("type").and_then(Value::as_str).unwrap_or_default(),
                r.get("amount").and_then(Value::as_f64).unwrap_or_default(),
            )
        }));
        Ok(success_one(totals))
    }

    async fn distinct(&self, resource: &str, column: &str) -> Result<Vec<Value>, AppError> {
        let entity = self.entity(resource)?;
        let rows = CrudService::fetch_all(&self.pool, &sql::select_distinct(entity, column)).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get(column).and_then(Value::as_str))
            .map(stats::filter_option)
            .collect())
    }

    /// Values accepted back by the statistics filters; bet types, bookmakers and tipsters share `bet_code`.
    async fn filter_options(&self) -> Result<ApiResponse, AppError> {
        let codes = self.distinct("bets", "bet_code").await?;
        Ok(success_one(json!({
            "sports": self.distinct("sports", "name").await?,
            "bet_types": codes,
            "bookmakers": codes,
            "tipsters": codes,
        })))
    }

    async fn logo_status(&self) -> Result<ApiResponse, AppError> {
        let entity = self.entity("teams")?;
        let list = ListQuery {
            not_null: vec!["sofascore_id".into()],
            ..Default::default()
        };
        let rows = CrudService::fetch_all(&self.pool, &sql::select_list(entity, &list)).await?;
        Ok(success_one(logo_status(&rows)))
    }
}

#[async_trait]
impl OperationExecutor for PgExecutor {
    async fn execute(&self, inv: &Invocation) -> Result<ApiResponse, AppError> {
        tracing::debug!(route = %inv.rule, params = ?inv.params, "executing");
        self.crud(inv).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn require(entity: &ResolvedEntity, op: EntityOperation) -> Result<(), AppError> {
    if entity.allows(op) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{:?} not allowed on {}",
            op, entity.resource
        )))
    }
}

fn parse_id(id_str: &str, pk_type: &PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::BigInt => {
            let n: i64 = id_str
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

fn member_id<'a>(inv: &'a Invocation, entity: &ResolvedEntity) -> Result<(Value, &'a str), AppError> {
    let raw = inv
        .member_id()
        .ok_or_else(|| AppError::BadRequest("missing id".into()))?;
    Ok((parse_id(raw, &entity.pk_type)?, raw))
}

fn path_id(inv: &Invocation, name: &str) -> Result<Value, AppError> {
    let raw = inv
        .param(name)
        .ok_or_else(|| AppError::BadRequest(format!("missing {}", name)))?;
    parse_id(raw, &PkType::BigInt)
}

fn push_optional_filter(list: &mut ListQuery, inv: &Invocation, key: &str) -> Result<(), AppError> {
    if let Some(raw) = inv.query(key).filter(|s| !s.is_empty()) {
        list.filters.push((key.to_string(), parse_id(raw, &PkType::BigInt)?));
    }
    Ok(())
}

fn query_value_for_column(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    let col_info = entity.column(col);
    let is_int = col_info.and_then(|c| c.pk_type.as_ref()) == Some(&PkType::BigInt)
        || col_info
            .and_then(|c| c.pg_type.as_deref())
            .map(|t| t.to_lowercase().contains("int"))
            .unwrap_or(false);
    let is_bool = col_info
        .and_then(|c| c.pg_type.as_deref())
        .map(|t| t.to_lowercase().starts_with("bool"))
        .unwrap_or(false);

    if is_int {
        if let Ok(n) = s.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    if is_bool {
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
    }
    Value::String(s.to_string())
}

/// Column filters plus limit/offset from the query string. Unknown keys are ignored.
fn list_query(entity: &ResolvedEntity, query: &HashMap<String, String>) -> ListQuery {
    let mut list = ListQuery {
        limit: query.get("limit").and_then(|v| v.parse().ok()),
        offset: query.get("offset").and_then(|v| v.parse().ok()),
        ..Default::default()
    };
    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();
    for k in keys {
        if RESERVED_QUERY_KEYS.contains(&k.as_str()) || entity.column(k).is_none() {
            continue;
        }
        list.filters.push((k.clone(), query_value_for_column(entity, k, &query[k])));
    }
    list
}

/// `sports` narrows by sport name; the [`BET_CODE_FILTERS`] lists each narrow by `bet_code`.
fn apply_bet_filters(list: &mut ListQuery, sports: &ResolvedEntity, inv: &Invocation) {
    let names = inv.query_list("sports");
    if !names.is_empty() {
        let names = names.iter().map(|n| Value::String(n.clone())).collect();
        list.within = Some(Within::any_of("sport_id", sports, "name", names));
    }
    for key in BET_CODE_FILTERS {
        let codes = inv.query_list(key);
        if !codes.is_empty() {
            let codes = codes.iter().map(|c| Value::String(c.clone())).collect();
            list.any_of.push(("bet_code".to_string(), codes));
        }
    }
}

/// Transactions dated on or after the instant `since`, compared as a timestamp.
fn transactions_since(since: DateTime<Utc>) -> DateRange {
    DateRange {
        column: "transaction_date".into(),
        start: Some(Value::String(since.to_rfc3339())),
        end: None,
        cast: Some("timestamptz".into()),
    }
}

/// `page` (default 1) and `limit` (default 30, capped at 50) for search actions.
fn page_params(query: &HashMap<String, String>) -> (u32, u32) {
    let page = query
        .get("page")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(SEARCH_DEFAULT_LIMIT)
        .min(SEARCH_MAX_LIMIT);
    (page, limit)
}

/// RFC 3339 timestamp or `YYYY-MM-DD`; a bare end date covers the whole day.
fn parse_bound(s: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let invalid = || AppError::BadRequest(format!("invalid date: {}", s));
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
    let at = if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    at.map(|t| t.and_utc()).ok_or_else(invalid)
}

#[derive(Debug, Serialize, PartialEq)]
struct LogoStatus {
    total_teams: usize,
    with_logo: usize,
    without_logo: usize,
    teams_without_logo: Vec<Value>,
}

/// Teams count as having a logo when `img` is set.
fn logo_status(teams: &[Value]) -> LogoStatus {
    let missing: Vec<Value> = teams
        .iter()
        .filter(|t| t.get("img").and_then(Value::as_str).map_or(true, str::is_empty))
        .map(|t| {
            json!({
                "id": t.get("id").cloned().unwrap_or(Value::Null),
                "name": t.get("name").cloned().unwrap_or(Value::Null),
                "sofascore_id": t.get("sofascore_id").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();
    LogoStatus {
        total_teams: teams.len(),
        with_logo: teams.len() - missing.len(),
        without_logo: missing.len(),
        teams_without_logo: missing,
    }
}
