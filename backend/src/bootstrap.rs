//! Startup sequencing: dependencies first, listener last.

use anyhow::Context;

use crate::{
    config::AppConfig,
    db::{self, DbPool},
    web_server::{run_server, AppState},
};

/// Connects and seeds the database. Nothing listens until this succeeds.
pub async fn init_dependencies(config: &AppConfig) -> anyhow::Result<DbPool> {
    let pool = db::connect(&config.database).await?;
    db::seed(&pool).await.context("Failed to seed database")?;
    Ok(pool)
}

pub async fn start(config: AppConfig) -> anyhow::Result<()> {
    let db_pool = init_dependencies(&config).await?;
    let app_state = AppState::new(db_pool, &config);

    tracing::info!("Initializing server...");
    run_server(app_state, &config).await
}
