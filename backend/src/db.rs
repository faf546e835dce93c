use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::SqliteConnectOptions;

pub use sqlx::sqlite::{SqlitePool as DbPool, SqlitePoolOptions as DbPoolOptions};

use crate::config::DatabaseConfig;

/// (name, category, seats, price per day)
const DEFAULT_FLEET: [(&str, &str, i64, i64); 6] = [
    ("Maruti Suzuki Swift", "Hatchback", 5, 1800),
    ("Hyundai Creta", "SUV", 5, 3200),
    ("Toyota Innova Crysta", "MUV", 7, 4200),
    ("Mahindra Thar", "SUV", 4, 3800),
    ("Honda City", "Sedan", 5, 2800),
    ("Kia Carens", "MUV", 7, 3500),
];

/// Opens the pool and applies the embedded migrations.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Invalid database url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = DbPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to the database")?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Migrations complete.");

    Ok(pool)
}

/// Inserts the default fleet into an empty `cars` table. Returns the number
/// of inserted rows, 0 when cars already exist.
pub async fn seed(pool: &DbPool) -> Result<u64, sqlx::Error> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cars")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::info!("Seed skipped, {} cars present", existing);
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for (name, category, seats, price_per_day) in DEFAULT_FLEET {
        inserted += sqlx::query(
            "INSERT INTO cars (name, category, seats, price_per_day, available) VALUES (?, ?, ?, ?, TRUE)",
        )
        .bind(name)
        .bind(category)
        .bind(seats)
        .bind(price_per_day)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;

    tracing::info!("Seeded {} cars", inserted);
    Ok(inserted)
}
