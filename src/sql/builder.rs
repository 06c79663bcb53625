//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a catalog entity.

use crate::catalog::ResolvedEntity;
use serde_json::Value;
use std::collections::HashMap;

/// Quote identifier for PostgreSQL (safe: only from catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value, returning its placeholder with an optional cast.
    fn push_cast(&mut self, v: Value, cast: Option<&str>) -> String {
        let n = self.push_param(v);
        match cast {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }

    /// Push a value bound to `column`, returning its placeholder with the column's cast.
    fn push_for_column(&mut self, entity: &ResolvedEntity, column: &str, v: Value) -> String {
        let cast = entity.column(column).and_then(|c| c.pg_type.as_deref());
        self.push_cast(v, cast)
    }
}

/// `column IN (SELECT pk FROM parent WHERE parent_column IN (values))`.
#[derive(Clone, Debug)]
pub struct Within {
    pub column: String,
    pub parent_table: String,
    pub parent_pk: String,
    pub parent_column: String,
    pub parent_cast: Option<String>,
    pub values: Vec<Value>,
}

impl Within {
    pub fn new(column: &str, parent: &ResolvedEntity, parent_column: &str, value: Value) -> Self {
        Self::any_of(column, parent, parent_column, vec![value])
    }

    /// Parent rows whose `parent_column` equals any of `values`.
    pub fn any_of(column: &str, parent: &ResolvedEntity, parent_column: &str, values: Vec<Value>) -> Self {
        Within {
            column: column.to_string(),
            parent_table: qualified_table(parent),
            parent_pk: parent.pk_column.clone(),
            parent_column: parent_column.to_string(),
            parent_cast: parent.column(parent_column).and_then(|c| c.pg_type.clone()),
            values,
        }
    }
}

/// Inclusive bounds on a date or timestamp column.
#[derive(Clone, Debug)]
pub struct DateRange {
    pub column: String,
    pub start: Option<Value>,
    pub end: Option<Value>,
    /// Bound type when it differs from the column's (`timestamptz` against a `date`).
    pub cast: Option<String>,
}

/// Listing parameters: exact-match filters, optional substring search, paging.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    /// `column IN (...)`; empty lists add no condition.
    pub any_of: Vec<(String, Vec<Value>)>,
    pub search: Option<String>,
    pub within: Option<Within>,
    pub range: Option<DateRange>,
    pub not_null: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// SELECT list; numeric columns come back as float8 so rows decode to JSON numbers.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if c.is_numeric() {
                format!("{}::float8 AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape LIKE metacharacters so the term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// `"col" = $n` for one value, `"col" IN ($n, ...)` for several.
fn membership(col: &str, placeholders: Vec<String>) -> String {
    if placeholders.len() == 1 {
        format!("{} = {}", col, placeholders[0])
    } else {
        format!("{} IN ({})", col, placeholders.join(", "))
    }
}

fn where_clause(q: &mut QueryBuf, entity: &ResolvedEntity, list: &ListQuery) -> String {
    let mut parts = Vec::new();
    for (col, val) in &list.filters {
        if entity.column(col).is_none() {
            continue;
        }
        let ph = q.push_for_column(entity, col, val.clone());
        parts.push(format!("{} = {}", quoted(col), ph));
    }
    for (col, values) in &list.any_of {
        if values.is_empty() || entity.column(col).is_none() {
            continue;
        }
        let phs = values
            .iter()
            .map(|v| q.push_for_column(entity, col, v.clone()))
            .collect();
        parts.push(membership(&quoted(col), phs));
    }
    if let Some(w) = list.within.as_ref().filter(|w| !w.values.is_empty()) {
        let phs = w
            .values
            .iter()
            .map(|v| q.push_cast(v.clone(), w.parent_cast.as_deref()))
            .collect();
        parts.push(format!(
            "{} IN (SELECT {} FROM {} WHERE {})",
            quoted(&w.column),
            quoted(&w.parent_pk),
            w.parent_table,
            membership(&quoted(&w.parent_column), phs)
        ));
    }
    if let Some(r) = &list.range {
        let cast = r
            .cast
            .as_deref()
            .or_else(|| entity.column(&r.column).and_then(|c| c.pg_type.as_deref()));
        if let Some(start) = &r.start {
            let ph = q.push_cast(start.clone(), cast);
            parts.push(format!("{} >= {}", quoted(&r.column), ph));
        }
        if let Some(end) = &r.end {
            let ph = q.push_cast(end.clone(), cast);
            parts.push(format!("{} <= {}", quoted(&r.column), ph));
        }
    }
    for col in &list.not_null {
        if entity.column(col).is_some() {
            parts.push(format!("{} IS NOT NULL", quoted(col)));
        }
    }
    if let (Some(term), Some(col)) = (list.search.as_deref(), entity.search_column.as_deref()) {
        if !term.is_empty() {
            let n = q.push_param(Value::String(like_pattern(term)));
            parts.push(format!("{} ILIKE ${}", quoted(col), n));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key. Caller binds the id as the sole param.
pub fn select_by_id(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &entity.pk_column;
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_column_list(entity),
        qualified_table(entity),
        quoted(pk)
    );
    q
}

/// SELECT with filters and search, ORDER BY the entity's order column then pk, LIMIT/OFFSET.
pub fn select_list(entity: &ResolvedEntity, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, entity, list);
    let order = entity.order_column();
    let order_clause = if order == entity.pk_column {
        format!(" ORDER BY {}", quoted(order))
    } else {
        format!(" ORDER BY {}, {}", quoted(order), quoted(&entity.pk_column))
    };
    let limit_clause = list.limit.map(|n| format!(" LIMIT {}", n.min(1000))).unwrap_or_default();
    let offset_clause = list.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(entity),
        qualified_table(entity),
        where_sql,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// COUNT(*) under the same filters and search as [`select_list`].
pub fn count(entity: &ResolvedEntity, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, entity, list);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_sql);
    q
}

/// Distinct non-null, non-empty values of one column, sorted.
pub fn select_distinct(entity: &ResolvedEntity, column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let col = quoted(column);
    q.sql = format!(
        "SELECT DISTINCT {col} FROM {} WHERE {col} IS NOT NULL AND {col}::text <> '' ORDER BY {col}",
        qualified_table(entity),
    );
    q
}

/// INSERT: omits the pk unless provided, and columns with a DB default when absent from body.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let include_pk = body.contains_key(&entity.pk_column);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if c.pk_type.is_some() && !include_pk {
            continue;
        }
        let val = body.get(&c.name).cloned();
        if val.is_none() && c.has_default {
            continue;
        }
        let ph = q.push_for_column(entity, &c.name, val.unwrap_or(Value::Null));
        cols.push(quoted(&c.name));
        placeholders.push(ph);
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        qualified_table(entity),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    q
}

/// UPDATE by id: SET only catalog columns present in body; always bumps updated_at.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &entity.pk_column;
    // Sorted so the generated SQL is stable across runs.
    let mut keys: Vec<&String> = body.keys().collect();
    keys.sort();
    let mut sets = Vec::new();
    for k in keys {
        if k == pk || k == "created_at" || k == "updated_at" || entity.column(k).is_none() {
            continue;
        }
        let ph = q.push_for_column(entity, k, body[k].clone());
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    if entity.column("updated_at").is_some() {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_ph = q.push_for_column(entity, pk, id.clone());
    if sets.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            select_column_list(entity),
            qualified_table(entity),
            quoted(pk),
            id_ph
        );
        return q;
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted(pk),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id. Caller binds the id as the sole param.
pub fn delete(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &entity.pk_column;
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1 RETURNING {}",
        qualified_table(entity),
        quoted(pk),
        select_column_list(entity)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::json;

    fn entity(name: &str) -> ResolvedEntity {
        Catalog::builtin().unwrap().entity(name).unwrap().clone()
    }

    #[test]
    fn select_by_id_casts_numeric_columns() {
        let q = select_by_id(&entity("bets"));
        assert!(q.sql.starts_with("SELECT \"id\", \"bet_date\", \"global_odds\"::float8 AS \"global_odds\""));
        assert!(q.sql.ends_with("FROM \"public\".\"bets\" WHERE \"id\" = $1"));
    }

    #[test]
    fn list_with_filters_search_and_paging() {
        let list = ListQuery {
            filters: vec![("sport_id".into(), json!(3)), ("not_a_column".into(), json!(1))],
            search: Some("50%_off".into()),
            limit: Some(5000),
            offset: Some(20),
            ..Default::default()
        };
        let mut e = entity("leagues");
        e.search_column = Some("name".into());
        let q = select_list(&e, &list);
        assert!(q.sql.contains("WHERE \"sport_id\" = $1::bigint AND \"name\" ILIKE $2"));
        assert!(q.sql.ends_with("ORDER BY \"name\", \"id\" LIMIT 1000 OFFSET 20"));
        assert_eq!(q.params, vec![json!(3), json!("%50\\%\\_off%")]);
    }

    #[test]
    fn count_shares_where_clause() {
        let list = ListQuery {
            search: Some("fra".into()),
            ..Default::default()
        };
        let q = count(&entity("countries"), &list);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"public\".\"countries\" WHERE \"name\" ILIKE $1"
        );
    }

    #[test]
    fn within_parent_and_date_range() {
        let catalog = Catalog::builtin().unwrap();
        let leagues = catalog.entity("leagues").unwrap();
        let list = ListQuery {
            within: Some(Within::new("league_id", leagues, "sport_id", json!("4"))),
            not_null: vec!["sofascore_id".into()],
            ..Default::default()
        };
        let q = select_list(catalog.entity("teams").unwrap(), &list);
        assert!(q.sql.contains(
            "WHERE \"league_id\" IN (SELECT \"id\" FROM \"public\".\"leagues\" WHERE \"sport_id\" = $1::bigint) AND \"sofascore_id\" IS NOT NULL"
        ));

        let list = ListQuery {
            range: Some(DateRange {
                column: "bet_date".into(),
                start: Some(json!("2024-01-01T00:00:00+00:00")),
                end: None,
                cast: None,
            }),
            ..Default::default()
        };
        let q = select_list(&entity("bets"), &list);
        assert!(q.sql.contains("WHERE \"bet_date\" >= $1::timestamptz ORDER BY \"bet_date\", \"id\""));
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn distinct_values() {
        let q = select_distinct(&entity("bets"), "bet_code");
        assert_eq!(
            q.sql,
            "SELECT DISTINCT \"bet_code\" FROM \"public\".\"bets\" WHERE \"bet_code\" IS NOT NULL AND \"bet_code\"::text <> '' ORDER BY \"bet_code\""
        );
    }

    #[test]
    fn insert_skips_defaulted_columns() {
        let body: HashMap<String, Value> = [
            ("bookmaker_name".to_string(), json!("Winamax")),
            ("bookmaker_img".to_string(), json!("winamax.png")),
        ]
        .into_iter()
        .collect();
        let q = insert(&entity("bookmakers"), &body);
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"bookmakers\" (\"bookmaker_name\", \"bookmaker_img\") VALUES ($1, $2) RETURNING"
        ));
        assert_eq!(q.params, vec![json!("Winamax"), json!("winamax.png")]);
    }

    #[test]
    fn update_sets_present_columns_and_timestamp() {
        let body: HashMap<String, Value> = [
            ("stake".to_string(), json!(12.5)),
            ("result".to_string(), json!("won")),
            ("id".to_string(), json!(99)),
            ("bogus".to_string(), json!(1)),
        ]
        .into_iter()
        .collect();
        let q = update(&entity("bets"), &json!(7), &body);
        assert!(q.sql.starts_with(
            "UPDATE \"public\".\"bets\" SET \"result\" = $1, \"stake\" = $2::numeric, \"updated_at\" = NOW() WHERE \"id\" = $3::bigint RETURNING"
        ));
        assert_eq!(q.params, vec![json!("won"), json!(12.5), json!(7)]);
    }

    #[test]
    fn delete_by_id() {
        let q = delete(&entity("events"));
        assert!(q.sql.starts_with("DELETE FROM \"public\".\"events\" WHERE \"id\" = $1 RETURNING"));
    }

    #[test]
    fn any_of_and_parent_name_lists() {
        let catalog = Catalog::builtin().unwrap();
        let list = ListQuery {
            any_of: vec![
                ("bet_code".into(), vec![json!("SIMPLE"), json!("COMBO")]),
                ("result".into(), vec![]),
                ("nope".into(), vec![json!(1)]),
            ],
            within: Some(Within::any_of(
                "sport_id",
                catalog.entity("sports").unwrap(),
                "name",
                vec![json!("football")],
            )),
            ..Default::default()
        };
        let q = count(catalog.entity("bets").unwrap(), &list);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"public\".\"bets\" WHERE \"bet_code\" IN ($1, $2) AND \"sport_id\" IN (SELECT \"id\" FROM \"public\".\"sports\" WHERE \"name\" = $3)"
        );
        assert_eq!(q.params, vec![json!("SIMPLE"), json!("COMBO"), json!("football")]);
    }
}
