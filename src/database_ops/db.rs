use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Row,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::DatabaseSettings;

/// The run's single database connection.
#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include credentials in tracing spans.
    #[instrument(skip(cfg), fields(host = %cfg.host, database = %cfg.name))]
    pub async fn connect(cfg: &DatabaseSettings) -> Result<Self> {
        let connect_options = connect_options(cfg)?;

        // Writes are strictly sequential, so one connection is all the run ever uses.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options)
            .await
            .context("connecting to the database")?;
        info!("connected to db");

        if cfg.auto_migrate {
            info!(dir = %cfg.migrations_dir.display(), "running migrations");
            run_migrations(&pool, &cfg.migrations_dir).await?;
        } else {
            info!("auto_migrate disabled; skipping migrations");
        }
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database connection closed");
    }
}

fn connect_options(cfg: &DatabaseSettings) -> Result<PgConnectOptions> {
    if let Some(url) = cfg.url.as_deref() {
        return PgConnectOptions::from_str(url).context("invalid database url");
    }
    Ok(PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.name))
}

/// Lightweight migration runner: applies `NNNN_description.sql` files in version order
/// and records them in `schema_migrations`. Files without a numeric prefix are ignored.
async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<()> {
    if !dir.exists() {
        info!(dir = %dir.display(), "migrations dir missing; nothing to apply");
        return Ok(());
    }
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT,
            installed_at TIMESTAMPTZ DEFAULT now()
         )",
    )
    .execute(pool)
    .await?;

    let mut applied: HashSet<i64> = HashSet::new();
    for r in sqlx::query("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?
    {
        applied.insert(r.try_get::<i64, _>(0)?);
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            if let Some((version, desc)) = parse_migration_name(name) {
                candidates.push((version, desc, path));
            }
        }
    }
    candidates.sort_by_key(|(v, _, _)| *v);

    for (version, desc, path) in candidates {
        if !applied.insert(version) {
            continue;
        }
        apply_migration(pool, version, &desc, &path).await?;
    }
    Ok(())
}

async fn apply_migration(pool: &PgPool, version: i64, desc: &str, path: &PathBuf) -> Result<()> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("reading migration {}", path.display()))?;
    info!(version, file = ?path, "applying migration");

    let mut tx = pool.begin().await?;
    sqlx::raw_sql(&sql)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("applying migration {}", path.display()))?;
    sqlx::query("INSERT INTO schema_migrations (version, description) VALUES ($1, $2)")
        .bind(version)
        .bind(desc)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// `0001_nhl_schema.sql` -> `(1, "nhl_schema")`.
fn parse_migration_name(name: &str) -> Option<(i64, String)> {
    let stem = name.strip_suffix(".sql")?;
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let rest = stem[digits.len()..].strip_prefix('_')?;
    Some((digits.parse().ok()?, rest.to_string()))
}
