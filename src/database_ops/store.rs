use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};

use crate::database_ops::db::Db;

/// A nullable column value. `None` binds SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub value: SqlValue,
}

impl Column {
    pub fn int(name: &'static str, value: i64) -> Self {
        Self::opt_int(name, Some(value))
    }

    pub fn opt_int(name: &'static str, value: Option<i64>) -> Self {
        Self {
            name,
            value: SqlValue::Int(value),
        }
    }

    pub fn float(name: &'static str, value: Option<f64>) -> Self {
        Self {
            name,
            value: SqlValue::Float(value),
        }
    }

    pub fn text(name: &'static str, value: &str) -> Self {
        Self::opt_text(name, Some(value))
    }

    pub fn opt_text(name: &'static str, value: Option<&str>) -> Self {
        Self {
            name,
            value: SqlValue::Text(value.map(str::to_string)),
        }
    }

    pub fn bool(name: &'static str, value: bool) -> Self {
        Self {
            name,
            value: SqlValue::Bool(Some(value)),
        }
    }

    pub fn date(name: &'static str, value: Option<NaiveDate>) -> Self {
        Self {
            name,
            value: SqlValue::Date(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Teams,
    Players,
    TeamPlayers,
    SkaterSeasonStats,
    GoalieSeasonStats,
    DraftPicks,
    JuniorSeasonStats,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Teams => "teams",
            Table::Players => "players",
            Table::TeamPlayers => "team_players",
            Table::SkaterSeasonStats => "skater_season_stats",
            Table::GoalieSeasonStats => "goalie_season_stats",
            Table::DraftPicks => "draft_picks",
            Table::JuniorSeasonStats => "junior_season_stats",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row shape that can be upserted by natural key.
pub trait Record {
    fn table(&self) -> Table;
    /// Natural key columns; used as the match predicate.
    fn key(&self) -> Vec<Column>;
    /// Every non-key column.
    fn values(&self) -> Vec<Column>;

    fn columns(&self) -> Vec<Column> {
        let mut columns = self.key();
        columns.extend(self.values());
        columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionGroup {
    Skaters,
    Goalies,
}

impl std::fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionGroup::Skaters => f.write_str("skaters"),
            PositionGroup::Goalies => f.write_str("goalies"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn exists(&self, table: Table, key: &[Column]) -> Result<bool>;

    /// Inserts one row in its own transaction.
    async fn insert(&self, table: Table, columns: &[Column]) -> Result<()>;

    /// Updates the rows matching `key` in its own transaction.
    async fn update(&self, table: Table, key: &[Column], columns: &[Column]) -> Result<()>;

    /// Team of the stint recorded as `(player, season, sequence)`, if any.
    async fn stint_team(&self, player_id: i64, season: &str, sequence: i32)
        -> Result<Option<i64>>;

    /// Persisted teams, optionally restricted to `ids`.
    async fn teams(&self, ids: Option<&[i64]>) -> Result<Vec<TeamRef>>;

    /// Distinct players holding at least one stint, split by position group.
    async fn rostered_players(&self, group: PositionGroup) -> Result<Vec<i64>>;
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &SqlValue) {
    match value {
        SqlValue::Int(v) => qb.push_bind(*v),
        SqlValue::Float(v) => qb.push_bind(*v),
        SqlValue::Text(v) => qb.push_bind(v.clone()),
        SqlValue::Bool(v) => qb.push_bind(*v),
        SqlValue::Date(v) => qb.push_bind(*v),
    };
}

fn push_key_filter(qb: &mut QueryBuilder<'_, Postgres>, key: &[Column]) {
    qb.push(" WHERE ");
    for (i, col) in key.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        qb.push(col.name).push(" = ");
        push_value(qb, &col.value);
    }
}

pub(crate) fn exists_query(table: Table, key: &[Column]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM ");
    qb.push(table.as_str());
    push_key_filter(&mut qb, key);
    qb.push(")");
    qb
}

pub(crate) fn insert_query(table: Table, columns: &[Column]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(table.as_str()).push(" (");
    {
        let mut names = qb.separated(", ");
        for col in columns {
            names.push(col.name);
        }
    }
    qb.push(") VALUES (");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, &col.value);
    }
    qb.push(")");
    qb
}

pub(crate) fn update_query(
    table: Table,
    key: &[Column],
    columns: &[Column],
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(table.as_str()).push(" SET ");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(col.name).push(" = ");
        push_value(&mut qb, &col.value);
    }
    push_key_filter(&mut qb, key);
    qb
}

impl Db {
    async fn execute_in_tx(&self, mut qb: QueryBuilder<'_, Postgres>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        match qb.build().execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl Store for Db {
    #[instrument(skip(self, key))]
    async fn exists(&self, table: Table, key: &[Column]) -> Result<bool> {
        let mut qb = exists_query(table, key);
        let found: bool = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(found)
    }

    #[instrument(skip(self, columns))]
    async fn insert(&self, table: Table, columns: &[Column]) -> Result<()> {
        self.execute_in_tx(insert_query(table, columns))
            .await
            .with_context(|| format!("insert into {table} rolled back"))?;
        Ok(())
    }

    #[instrument(skip(self, key, columns))]
    async fn update(&self, table: Table, key: &[Column], columns: &[Column]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }
        let rows = self
            .execute_in_tx(update_query(table, key, columns))
            .await
            .with_context(|| format!("update of {table} rolled back"))?;
        debug!(rows, "updated");
        Ok(())
    }

    async fn stint_team(
        &self,
        player_id: i64,
        season: &str,
        sequence: i32,
    ) -> Result<Option<i64>> {
        let team: Option<i64> = sqlx::query_scalar(
            "SELECT team_id FROM team_players WHERE player_id = $1 AND season = $2 AND sequence = $3",
        )
        .bind(player_id)
        .bind(season)
        .bind(i64::from(sequence))
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn teams(&self, ids: Option<&[i64]>) -> Result<Vec<TeamRef>> {
        let rows: Vec<(i64, String)> = match ids {
            Some(ids) => {
                sqlx::query_as("SELECT id, name FROM teams WHERE id = ANY($1) ORDER BY id")
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT id, name FROM teams ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(|(id, name)| TeamRef { id, name })
            .collect())
    }

    async fn rostered_players(&self, group: PositionGroup) -> Result<Vec<i64>> {
        let sql = match group {
            PositionGroup::Skaters => {
                "SELECT DISTINCT tp.player_id FROM team_players tp
                 JOIN players p ON p.id = tp.player_id
                 WHERE p.position_code IS DISTINCT FROM 'G'
                 ORDER BY tp.player_id"
            }
            PositionGroup::Goalies => {
                "SELECT DISTINCT tp.player_id FROM team_players tp
                 JOIN players p ON p.id = tp.player_id
                 WHERE p.position_code = 'G'
                 ORDER BY tp.player_id"
            }
        };
        let ids: Vec<i64> = sqlx::query_scalar(sql).fetch_all(&self.pool).await?;
        Ok(ids)
    }
}
