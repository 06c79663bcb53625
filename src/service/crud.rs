//! Generic CRUD execution against PostgreSQL.

use crate::catalog::ResolvedEntity;
use crate::error::AppError;
use crate::sql::{self, bind_all, ListQuery, QueryBuf};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

pub struct CrudService;

impl CrudService {
    /// List rows with optional filters (exact match), limit (default 100, max 1000), offset (default 0).
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        list: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        let list = ListQuery {
            limit: Some(list.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
            offset: Some(list.offset.unwrap_or(0)),
            ..list.clone()
        };
        let q = sql::select_list(entity, &list);
        Self::fetch_all(pool, &q).await
    }

    /// Number of rows matching the listing's filters and search.
    pub async fn count(pool: &PgPool, entity: &ResolvedEntity, list: &ListQuery) -> Result<i64, AppError> {
        let q = sql::count(entity, list);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(pool)
            .await
            .and_then(|row| sqlx::Row::try_get(&row, 0))?;
        Ok(n)
    }

    /// Fetch one row by primary key. Returns JSON object or None.
    pub async fn read(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let mut q = sql::select_by_id(entity);
        q.params.push(id.clone());
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row; body may include or omit PK (if has default). Returns created row.
    pub async fn create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = sql::insert(entity, body);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id. Returns updated row.
    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(entity, id, body);
        Self::fetch_optional(pool, &q).await
    }

    /// Delete one row by id. Returns deleted row or None.
    pub async fn delete(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let mut q = sql::delete(entity);
        q.params.push(id.clone());
        Self::fetch_optional(pool, &q).await
    }

    /// Run an arbitrary built query and decode every row to JSON.
    pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

pub(crate) fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn number(n: f64) -> Option<Value> {
    serde_json::Number::from_f64(n).map(Value::Number)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(v) = number(n as f64) {
            return v;
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(v) = number(n) {
            return v;
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
