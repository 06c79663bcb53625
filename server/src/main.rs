//! bet-tracker HTTP server.
//!
//! Run from repo root: `cargo run -p bet-tracker-server`

use bet_tracker::{app, build_route_table, seed, AppState, Catalog, PgExecutor, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bet_tracker=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = Catalog::builtin()?;
    let routes = build_route_table(&catalog)?;
    tracing::info!(routes = routes.len(), "route table ready");

    tracing::info!(target = %settings.database.describe(), "connecting to database");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect_with(settings.database.connect_options()?)
        .await?;

    if settings.seed_demo_data {
        seed::seed_demo_data(&pool, &catalog).await?;
    }

    if settings.api_token.is_some() {
        tracing::info!("bearer token required outside public endpoints");
    }
    let state = AppState::new(
        routes,
        settings.access_policy(),
        Arc::new(PgExecutor::new(pool, catalog)),
    );

    let listener = TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!("bet-tracker listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
