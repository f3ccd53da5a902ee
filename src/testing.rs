// In-memory doubles for the API and the database, used by the unit tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::models::ApiPerson;
use crate::api::{ApiError, Endpoints, NhlApi};
use crate::config::{Links, NHL_LEAGUE};
use crate::context::PullContext;
use crate::database_ops::records::{Player, Team};
use crate::database_ops::{Column, PositionGroup, Record, SqlValue, Store, Table, TeamRef};

/// Store that enforces the same primary, unique and foreign keys as the schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Vec<Column>>>>,
    failing: Mutex<HashSet<Table>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later insert or update on `table` fails.
    pub fn fail_writes_to(&self, table: Table) {
        self.failing.lock().unwrap().insert(table);
    }

    pub fn rows(&self, table: Table) -> Vec<Vec<Column>> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, table: Table) -> usize {
        self.rows(table).len()
    }

    pub fn find(&self, table: Table, key: &[Column]) -> Option<Vec<Column>> {
        self.rows(table).into_iter().find(|row| matches(row, key))
    }

    /// Successful inserts and updates so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, table: Table) -> Result<()> {
        if self.failing.lock().unwrap().contains(&table) {
            bail!("simulated write failure on {table}");
        }
        Ok(())
    }
}

fn primary_key(table: Table) -> &'static [&'static str] {
    match table {
        Table::Teams | Table::Players => &["id"],
        Table::TeamPlayers | Table::SkaterSeasonStats | Table::GoalieSeasonStats => {
            &["player_id", "team_id", "season", "sequence"]
        }
        Table::DraftPicks => &["draft_year", "overall_pick"],
        Table::JuniorSeasonStats => &["player_id", "season", "sequence"],
    }
}

fn project(row: &[Column], names: &[&str]) -> Vec<Column> {
    row.iter()
        .filter(|c| names.contains(&c.name))
        .cloned()
        .collect()
}

fn matches(row: &[Column], key: &[Column]) -> bool {
    key.iter()
        .all(|k| row.iter().any(|c| c.name == k.name && c.value == k.value))
}

fn value_of(row: &[Column], name: &str) -> Option<SqlValue> {
    row.iter().find(|c| c.name == name).map(|c| c.value.clone())
}

pub fn int_of(row: &[Column], name: &str) -> Option<i64> {
    match value_of(row, name) {
        Some(SqlValue::Int(v)) => v,
        _ => None,
    }
}

pub fn text_of(row: &[Column], name: &str) -> Option<String> {
    match value_of(row, name) {
        Some(SqlValue::Text(v)) => v,
        _ => None,
    }
}

pub fn bool_of(row: &[Column], name: &str) -> Option<bool> {
    match value_of(row, name) {
        Some(SqlValue::Bool(v)) => v,
        _ => None,
    }
}

/// Parent rows `row` points at. NULL references are not checked.
fn foreign_keys(table: Table, row: &[Column]) -> Vec<(Table, Vec<Column>)> {
    let by_id = |parent: Table, column: &str| {
        int_of(row, column).map(|id| (parent, vec![Column::int("id", id)]))
    };
    match table {
        Table::Teams | Table::Players => Vec::new(),
        Table::TeamPlayers => [by_id(Table::Players, "player_id"), by_id(Table::Teams, "team_id")]
            .into_iter()
            .flatten()
            .collect(),
        Table::SkaterSeasonStats | Table::GoalieSeasonStats => vec![(
            Table::TeamPlayers,
            project(row, primary_key(Table::TeamPlayers)),
        )],
        Table::DraftPicks => [by_id(Table::Players, "player_id"), by_id(Table::Teams, "team_id")]
            .into_iter()
            .flatten()
            .collect(),
        Table::JuniorSeasonStats => by_id(Table::Players, "player_id").into_iter().collect(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn exists(&self, table: Table, key: &[Column]) -> Result<bool> {
        Ok(self.find(table, key).is_some())
    }

    async fn insert(&self, table: Table, columns: &[Column]) -> Result<()> {
        self.check_writable(table)?;
        let mut tables = self.tables.lock().unwrap();
        let holds = |t: Table, key: &[Column]| {
            tables
                .get(&t)
                .is_some_and(|rows| rows.iter().any(|r| matches(r, key)))
        };

        if holds(table, &project(columns, primary_key(table))) {
            bail!("duplicate key value violates primary key of {table}");
        }
        if table == Table::TeamPlayers
            && holds(table, &project(columns, &["player_id", "season", "sequence"]))
        {
            bail!("duplicate stint sequence in {table}");
        }
        for (parent, key) in foreign_keys(table, columns) {
            if !holds(parent, &key) {
                bail!("insert into {table} violates foreign key to {parent}");
            }
        }

        tables.entry(table).or_default().push(columns.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, table: Table, key: &[Column], columns: &[Column]) -> Result<()> {
        self.check_writable(table)?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| matches(r, key)) {
                for col in columns {
                    match row.iter_mut().find(|c| c.name == col.name) {
                        Some(existing) => existing.value = col.value.clone(),
                        None => row.push(col.clone()),
                    }
                }
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stint_team(
        &self,
        player_id: i64,
        season: &str,
        sequence: i32,
    ) -> Result<Option<i64>> {
        let key = [
            Column::int("player_id", player_id),
            Column::text("season", season),
            Column::int("sequence", i64::from(sequence)),
        ];
        Ok(self
            .find(Table::TeamPlayers, &key)
            .and_then(|row| int_of(&row, "team_id")))
    }

    async fn teams(&self, ids: Option<&[i64]>) -> Result<Vec<TeamRef>> {
        let mut teams: Vec<TeamRef> = self
            .rows(Table::Teams)
            .iter()
            .filter_map(|row| {
                Some(TeamRef {
                    id: int_of(row, "id")?,
                    name: text_of(row, "name")?,
                })
            })
            .filter(|t| ids.map_or(true, |ids| ids.contains(&t.id)))
            .collect();
        teams.sort_by_key(|t| t.id);
        Ok(teams)
    }

    async fn rostered_players(&self, group: PositionGroup) -> Result<Vec<i64>> {
        let players = self.rows(Table::Players);
        let is_goalie = |id: i64| {
            players.iter().any(|p| {
                int_of(p, "id") == Some(id) && text_of(p, "position_code").as_deref() == Some("G")
            })
        };
        let ids: BTreeSet<i64> = self
            .rows(Table::TeamPlayers)
            .iter()
            .filter_map(|row| int_of(row, "player_id"))
            .filter(|&id| is_goalie(id) == (group == PositionGroup::Goalies))
            .collect();
        Ok(ids.into_iter().collect())
    }
}

/// Canned API: serves registered bodies and answers 404 for anything else.
#[derive(Default)]
pub struct FakeApi {
    responses: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn respond(&self, url: &str, body: Value) {
        self.responses.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| *r == url).count()
    }
}

#[async_trait]
impl NhlApi for FakeApi {
    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub const SEASON: &str = "20222023";

/// Owns everything a [`PullContext`] borrows.
pub struct Fixture {
    pub store: MemoryStore,
    pub api: FakeApi,
    pub endpoints: Endpoints,
    pub season: String,
    pub leagues: Vec<String>,
}

impl Fixture {
    pub fn new() -> Self {
        let links = Links {
            site: "https://nhl.test".into(),
            teams: "https://nhl.test/api/v1/teams".into(),
            players: "https://nhl.test/api/v1/people".into(),
            draft: "https://nhl.test/api/v1/draft".into(),
            prospects: None,
        };
        Self {
            store: MemoryStore::new(),
            api: FakeApi::default(),
            endpoints: Endpoints::new(&links, "stats?stats=yearByYear"),
            season: SEASON.into(),
            leagues: vec![NHL_LEAGUE.to_string()],
        }
    }

    pub fn ctx(&self) -> PullContext<'_> {
        PullContext {
            store: &self.store,
            api: &self.api,
            endpoints: &self.endpoints,
            season: &self.season,
            leagues: &self.leagues,
        }
    }
}

pub fn team_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "abbreviation": name.chars().take(3).collect::<String>().to_uppercase(),
        "conference": {"id": 6},
        "division": {"id": 17},
        "franchise": {"franchiseId": id + 100},
        "active": true
    })
}

pub fn person_json(id: i64, name: &str, position: &str, active: bool) -> Value {
    let kind = if position == "G" { "Goalie" } else { "Forward" };
    json!({
        "id": id,
        "fullName": name,
        "birthDate": "2000-01-31",
        "active": active,
        "primaryPosition": {"code": position, "name": kind, "type": kind, "abbreviation": position}
    })
}

pub fn split_json(season: &str, team_id: i64, league: &str, sequence: i32, stat: Value) -> Value {
    json!({
        "season": season,
        "team": {"id": team_id, "name": format!("Team {team_id}")},
        "league": {"name": league},
        "sequenceNumber": sequence,
        "stat": stat
    })
}

pub fn year_by_year_json(splits: Vec<Value>) -> Value {
    json!({"stats": [{"type": {"displayName": "yearByYear"}, "splits": splits}]})
}

pub fn roster_json(ids: &[i64]) -> Value {
    let roster: Vec<Value> = ids
        .iter()
        .map(|id| json!({"person": {"id": id, "fullName": format!("Player {id}")}}))
        .collect();
    json!({"roster": roster})
}

pub async fn seed_team(store: &MemoryStore, id: i64, name: &str) {
    let team = Team {
        id,
        name: name.into(),
        abbreviation: None,
        conference_id: None,
        division_id: None,
        franchise_id: None,
        active: true,
    };
    store.insert(Table::Teams, &team.columns()).await.unwrap();
}

pub async fn seed_person(store: &MemoryStore, id: i64, name: &str, position: &str) {
    let person: ApiPerson = serde_json::from_value(person_json(id, name, position, true)).unwrap();
    let player = Player::from(&person);
    store.insert(Table::Players, &player.columns()).await.unwrap();
}

pub async fn seed_player(store: &MemoryStore, id: i64, name: &str) {
    seed_person(store, id, name, "C").await;
}
