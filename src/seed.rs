//! Demo data: default bookmakers and a handful of bankroll transactions.

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::service::CrudService;
use crate::sql::ListQuery;
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;

/// `(bookmaker_name, bookmaker_img)`.
pub const DEFAULT_BOOKMAKERS: &[(&str, &str)] = &[
    ("Winamax", "winamax.png"),
    ("Betclic", "betclic.png"),
    ("Unibet", "unibet.png"),
    ("Bwin", "bwin.png"),
    ("PMU", "pmu.png"),
    ("Parions Sport", "parions-sport.png"),
    ("Zebet", "zebet.png"),
    ("Bet365", "bet365.png"),
    ("NetBet", "netbet.png"),
    ("Vbet", "vbet.png"),
];

fn row(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Four transactions dated relative to `today`.
pub fn demo_transactions(today: NaiveDate) -> Vec<HashMap<String, Value>> {
    let day = |ago: i64| (today - Duration::days(ago)).format("%Y-%m-%d").to_string();
    [
        ("deposit", 1000.0, 30, "Dépôt initial", "Virement bancaire"),
        ("deposit", 500.0, 20, "Rechargement compte", "Carte bancaire"),
        ("withdraw", 200.0, 10, "Retrait gains", "Virement bancaire"),
        ("deposit", 300.0, 5, "Nouveau dépôt", "PayPal"),
    ]
    .into_iter()
    .map(|(kind, amount, ago, description, method)| {
        row(vec![
            ("type", json!(kind)),
            ("amount", json!(amount)),
            ("transaction_date", json!(day(ago))),
            ("description", json!(description)),
            ("method", json!(method)),
        ])
    })
    .collect()
}

/// Insert each default bookmaker whose name is not present yet. Returns how many were inserted.
pub async fn seed_bookmakers(pool: &PgPool, catalog: &Catalog) -> Result<usize, AppError> {
    let entity = catalog
        .entity("bookmakers")
        .ok_or_else(|| AppError::NotFound("resource bookmakers".into()))?;
    let mut inserted = 0;
    for (name, img) in DEFAULT_BOOKMAKERS {
        let existing = ListQuery {
            filters: vec![("bookmaker_name".into(), json!(name))],
            limit: Some(1),
            ..Default::default()
        };
        if CrudService::count(pool, entity, &existing).await? > 0 {
            continue;
        }
        let body = row(vec![("bookmaker_name", json!(name)), ("bookmaker_img", json!(img))]);
        CrudService::create(pool, entity, &body).await?;
        inserted += 1;
    }
    tracing::info!(inserted, "seeded bookmakers");
    Ok(inserted)
}

/// Insert the demo transactions, only into an empty table.
pub async fn seed_transactions(pool: &PgPool, catalog: &Catalog, today: NaiveDate) -> Result<usize, AppError> {
    let entity = catalog
        .entity("transactions")
        .ok_or_else(|| AppError::NotFound("resource transactions".into()))?;
    if CrudService::count(pool, entity, &ListQuery::default()).await? > 0 {
        tracing::info!("transactions present, skipping demo transactions");
        return Ok(0);
    }
    let rows = demo_transactions(today);
    for body in &rows {
        CrudService::create(pool, entity, body).await?;
    }
    tracing::info!(inserted = rows.len(), "seeded demo transactions");
    Ok(rows.len())
}

/// Bookmakers, then transactions dated from today (UTC).
pub async fn seed_demo_data(pool: &PgPool, catalog: &Catalog) -> Result<(), AppError> {
    seed_bookmakers(pool, catalog).await?;
    seed_transactions(pool, catalog, chrono::Utc::now().date_naive()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RequestValidator;

    #[test]
    fn bookmakers_have_unique_names() {
        let mut names: Vec<&str> = DEFAULT_BOOKMAKERS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
        assert!(DEFAULT_BOOKMAKERS.contains(&("Parions Sport", "parions-sport.png")));
    }

    #[test]
    fn demo_transactions_are_relative_and_valid() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let rows = demo_transactions(today);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["transaction_date"], json!("2024-05-31"));
        assert_eq!(rows[2]["type"], json!("withdraw"));
        assert_eq!(rows[3]["method"], json!("PayPal"));

        let rules = &Catalog::builtin().unwrap().entity("transactions").unwrap().validation.clone();
        for r in &rows {
            RequestValidator::validate(r, rules).unwrap();
        }
    }
}
