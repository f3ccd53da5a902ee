// Upstream payload models. Only the fields the pull stages read are modeled; the
// copyright field and everything else is ignored.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiError;

/// Pulls the single payload field out of a response object and decodes it.
pub fn payload<T: DeserializeOwned>(mut body: Value, key: &'static str) -> Result<T, ApiError> {
    let field = body
        .get_mut(key)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or(ApiError::MissingPayload { key })?;
    serde_json::from_value(field).map_err(|source| ApiError::Decode { key, source })
}

/// Like [`payload`] for list payloads, returning the first element.
pub fn first<T: DeserializeOwned>(body: Value, key: &'static str) -> Result<T, ApiError> {
    payload::<Vec<T>>(body, key)?
        .into_iter()
        .next()
        .ok_or(ApiError::MissingPayload { key })
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseRef {
    pub franchise_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeam {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub conference: Option<IdRef>,
    pub division: Option<IdRef>,
    pub franchise: Option<FranchiseRef>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub person: PersonRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: i64,
    pub full_name: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPerson {
    pub id: i64,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub link: Option<String>,
    pub birth_date: Option<String>,
    pub current_age: Option<i64>,
    pub nationality: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i64>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub rookie: bool,
    pub shoots_catches: Option<String>,
    pub primary_position: Option<Position>,
}

/// One entry of the `stats` payload; year-by-year requests return exactly one.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsBlock {
    #[serde(default)]
    pub splits: Vec<SeasonSplit>,
}

/// One stint as reported by a year-by-year request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSplit {
    pub season: String,
    pub team: NamedRef,
    pub league: NamedRef,
    pub sequence_number: i32,
    #[serde(default)]
    pub stat: SplitStat,
}

impl SeasonSplit {
    pub fn league_name(&self) -> &str {
        self.league.name.as_deref().unwrap_or_default()
    }
}

/// Union of the skater and goalie stat lines; absent numbers stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitStat {
    pub time_on_ice: Option<String>,
    pub games: Option<i64>,
    pub assists: Option<i64>,
    pub goals: Option<i64>,
    pub pim: Option<i64>,
    pub shots: Option<i64>,
    pub hits: Option<i64>,
    pub power_play_goals: Option<i64>,
    pub power_play_points: Option<i64>,
    pub power_play_time_on_ice: Option<String>,
    pub even_time_on_ice: Option<String>,
    pub face_off_pct: Option<f64>,
    pub shot_pct: Option<f64>,
    pub game_winning_goals: Option<i64>,
    pub over_time_goals: Option<i64>,
    pub short_handed_goals: Option<i64>,
    pub short_handed_points: Option<i64>,
    pub short_handed_time_on_ice: Option<String>,
    pub blocked: Option<i64>,
    pub plus_minus: Option<i64>,
    pub points: Option<i64>,
    pub shifts: Option<i64>,
    // goalie
    pub games_started: Option<i64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub ot: Option<i64>,
    pub shutouts: Option<i64>,
    pub saves: Option<i64>,
    pub power_play_saves: Option<i64>,
    pub short_handed_saves: Option<i64>,
    pub even_saves: Option<i64>,
    pub power_play_shots: Option<i64>,
    pub short_handed_shots: Option<i64>,
    pub even_shots: Option<i64>,
    pub save_percentage: Option<f64>,
    pub goal_against_average: Option<f64>,
    pub shots_against: Option<i64>,
    pub goals_against: Option<i64>,
    pub power_play_save_percentage: Option<f64>,
    pub short_handed_save_percentage: Option<f64>,
    pub even_strength_save_percentage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default, deserialize_with = "flex_i64_opt")]
    pub draft_year: Option<i64>,
    #[serde(default)]
    pub rounds: Vec<DraftRound>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftRound {
    #[serde(default)]
    pub picks: Vec<ApiDraftPick>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDraftPick {
    // upstream sends the round as a string ("1")
    #[serde(deserialize_with = "flex_i64")]
    pub round: i64,
    #[serde(deserialize_with = "flex_i64")]
    pub pick_overall: i64,
    #[serde(deserialize_with = "flex_i64")]
    pub pick_in_round: i64,
    pub team: Option<NamedRef>,
    pub prospect: Option<PersonRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmateurRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProspect {
    pub id: i64,
    pub nhl_player_id: Option<i64>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i64>,
    pub shoots_catches: Option<String>,
    pub primary_position: Option<Position>,
    pub amateur_team: Option<AmateurRef>,
    pub amateur_league: Option<AmateurRef>,
}

fn flex_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    flex_i64_opt(deserializer)?.ok_or_else(|| de::Error::custom("expected an integer"))
}

fn flex_i64_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("integer out of range: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("not an integer: '{s}'"))),
        Some(other) => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}
