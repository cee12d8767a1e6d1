use std::collections::HashMap;
use std::str::FromStr;

use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing::{info, warn};

use crate::domain::registry::LocationRegistry;
use crate::domain::types::Location;
use crate::error::{Result, RouteError};

const PROVIDER: &str = "sqlite";

fn db_error(e: sqlx::Error) -> RouteError {
    RouteError::upstream(PROVIDER, e)
}

pub async fn db_connection() -> Result<SqlitePool> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        warn!("DATABASE_URL not set, using default SQLite file");
        "sqlite:ecoroute.sqlite".to_string()
    });
    connect(&database_url).await
}

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(db_error)?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.map_err(db_error)?;
    info!("Connected to SQLite database at {database_url}");

    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            name TEXT PRIMARY KEY,
            elevation_m INTEGER NOT NULL DEFAULT 0,
            added_weight_kg REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_error)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS location_aliases (
            address TEXT PRIMARY KEY,
            name TEXT NOT NULL REFERENCES locations(name)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_error)?;

    Ok(())
}

pub async fn upsert_location(pool: &SqlitePool, location: &Location) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO locations (name, elevation_m, added_weight_kg)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&location.id)
    .bind(location.elevation_m)
    .bind(location.added_weight_kg)
    .execute(pool)
    .await
    .map_err(db_error)?;
    Ok(())
}

pub async fn upsert_alias(pool: &SqlitePool, address: &str, name: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO location_aliases (address, name) VALUES (?, ?)")
        .bind(address)
        .bind(name)
        .execute(pool)
        .await
        .map_err(db_error)?;
    Ok(())
}

pub async fn load_registry(pool: &SqlitePool) -> Result<LocationRegistry> {
    let rows: Vec<(String, i64, f64)> =
        sqlx::query_as("SELECT name, elevation_m, added_weight_kg FROM locations")
            .fetch_all(pool)
            .await
            .map_err(db_error)?;
    let locations = rows
        .into_iter()
        .map(|(name, elevation, weight)| {
            let elevation = i32::try_from(elevation).map_err(|_| {
                RouteError::upstream(PROVIDER, format!("elevation {elevation} of '{name}'"))
            })?;
            Ok(Location::new(name, elevation, weight))
        })
        .collect::<Result<Vec<_>>>()?;

    let aliases: HashMap<String, String> =
        sqlx::query_as::<_, (String, String)>("SELECT address, name FROM location_aliases")
            .fetch_all(pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .collect();

    info!(
        "Loaded {} locations and {} aliases from SQLite",
        locations.len(),
        aliases.len()
    );
    Ok(LocationRegistry::new(locations, aliases))
}
