// Row shapes persisted by the pull stages, with their natural keys.

use chrono::NaiveDate;

use crate::api::models::{ApiPerson, ApiProspect, ApiTeam, SeasonSplit};
use crate::database_ops::store::{Column, Record, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub conference_id: Option<i64>,
    pub division_id: Option<i64>,
    pub franchise_id: Option<i64>,
    pub active: bool,
}

impl From<&ApiTeam> for Team {
    fn from(t: &ApiTeam) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            abbreviation: t.abbreviation.clone(),
            conference_id: t.conference.as_ref().map(|c| c.id),
            division_id: t.division.as_ref().map(|d| d.id),
            franchise_id: t.franchise.as_ref().map(|f| f.franchise_id),
            active: t.active,
        }
    }
}

impl Record for Team {
    fn table(&self) -> Table {
        Table::Teams
    }

    fn key(&self) -> Vec<Column> {
        vec![Column::int("id", self.id)]
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::text("name", &self.name),
            Column::opt_text("abbreviation", self.abbreviation.as_deref()),
            Column::opt_int("conf_id", self.conference_id),
            Column::opt_int("division_id", self.division_id),
            Column::opt_int("franchise_id", self.franchise_id),
            Column::bool("active", self.active),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: i64,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub link: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub current_age: Option<i64>,
    pub nationality: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i64>,
    pub active: bool,
    pub rookie: bool,
    pub shoots_catches: Option<String>,
    pub position_code: Option<String>,
    pub position_name: Option<String>,
    pub position_type: Option<String>,
}

impl From<&ApiPerson> for Player {
    fn from(p: &ApiPerson) -> Self {
        let position = p.primary_position.as_ref();
        Self {
            id: p.id,
            full_name: p.full_name.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            link: p.link.clone(),
            birth_date: parse_date(p.birth_date.as_deref()),
            current_age: p.current_age,
            nationality: p.nationality.clone(),
            height: p.height.clone(),
            weight: p.weight,
            active: p.active,
            rookie: p.rookie,
            shoots_catches: p.shoots_catches.clone(),
            position_code: position.and_then(|pos| pos.abbreviation.clone().or(pos.code.clone())),
            position_name: position.and_then(|pos| pos.name.clone()),
            position_type: position.and_then(|pos| pos.kind.clone()),
        }
    }
}

impl Record for Player {
    fn table(&self) -> Table {
        Table::Players
    }

    fn key(&self) -> Vec<Column> {
        vec![Column::int("id", self.id)]
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::text("full_name", &self.full_name),
            Column::opt_text("first_name", self.first_name.as_deref()),
            Column::opt_text("last_name", self.last_name.as_deref()),
            Column::opt_text("link", self.link.as_deref()),
            Column::date("birth_date", self.birth_date),
            Column::opt_int("current_age", self.current_age),
            Column::opt_text("nationality", self.nationality.as_deref()),
            Column::opt_text("height", self.height.as_deref()),
            Column::opt_int("weight", self.weight),
            Column::bool("active", self.active),
            Column::bool("rookie", self.rookie),
            Column::opt_text("shoots_catches", self.shoots_catches.as_deref()),
            Column::opt_text("position_code", self.position_code.as_deref()),
            Column::opt_text("position_name", self.position_name.as_deref()),
            Column::opt_text("position_type", self.position_type.as_deref()),
        ]
    }
}

/// Identity of one stint: `(player, team, season, sequence)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StintKey {
    pub player_id: i64,
    pub team_id: i64,
    pub season: String,
    pub sequence: i32,
}

impl StintKey {
    fn columns(&self) -> Vec<Column> {
        vec![
            Column::int("player_id", self.player_id),
            Column::int("team_id", self.team_id),
            Column::text("season", &self.season),
            Column::int("sequence", i64::from(self.sequence)),
        ]
    }
}

/// Bridge row: one stint of a player on a team during a season.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamPlayer {
    pub stint: StintKey,
    pub active: bool,
}

impl Record for TeamPlayer {
    fn table(&self) -> Table {
        Table::TeamPlayers
    }

    fn key(&self) -> Vec<Column> {
        self.stint.columns()
    }

    fn values(&self) -> Vec<Column> {
        vec![Column::bool("active", self.active)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkaterSeasonStats {
    pub stint: StintKey,
    pub time_on_ice: Option<String>,
    pub games: Option<i64>,
    pub assists: Option<i64>,
    pub goals: Option<i64>,
    pub pim: Option<i64>,
    pub shots: Option<i64>,
    pub hits: Option<i64>,
    pub pp_goals: Option<i64>,
    pub pp_points: Option<i64>,
    pub pp_toi: Option<String>,
    pub even_toi: Option<String>,
    pub faceoff_pct: Option<f64>,
    pub shot_pct: Option<f64>,
    pub gw_goals: Option<i64>,
    pub ot_goals: Option<i64>,
    pub sh_goals: Option<i64>,
    pub sh_points: Option<i64>,
    pub sh_toi: Option<String>,
    pub blocked_shots: Option<i64>,
    pub plus_minus: Option<i64>,
    pub points: Option<i64>,
    pub shifts: Option<i64>,
}

impl SkaterSeasonStats {
    pub fn from_split(stint: StintKey, split: &SeasonSplit) -> Self {
        let s = &split.stat;
        Self {
            stint,
            time_on_ice: s.time_on_ice.clone(),
            games: s.games,
            assists: s.assists,
            goals: s.goals,
            pim: s.pim,
            shots: s.shots,
            hits: s.hits,
            pp_goals: s.power_play_goals,
            pp_points: s.power_play_points,
            pp_toi: s.power_play_time_on_ice.clone(),
            even_toi: s.even_time_on_ice.clone(),
            faceoff_pct: s.face_off_pct,
            shot_pct: s.shot_pct,
            gw_goals: s.game_winning_goals,
            ot_goals: s.over_time_goals,
            sh_goals: s.short_handed_goals,
            sh_points: s.short_handed_points,
            sh_toi: s.short_handed_time_on_ice.clone(),
            blocked_shots: s.blocked,
            plus_minus: s.plus_minus,
            points: s.points,
            shifts: s.shifts,
        }
    }
}

impl Record for SkaterSeasonStats {
    fn table(&self) -> Table {
        Table::SkaterSeasonStats
    }

    fn key(&self) -> Vec<Column> {
        self.stint.columns()
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::opt_text("time_on_ice", self.time_on_ice.as_deref()),
            Column::opt_int("games", self.games),
            Column::opt_int("assists", self.assists),
            Column::opt_int("goals", self.goals),
            Column::opt_int("pim", self.pim),
            Column::opt_int("shots", self.shots),
            Column::opt_int("hits", self.hits),
            Column::opt_int("pp_goals", self.pp_goals),
            Column::opt_int("pp_points", self.pp_points),
            Column::opt_text("pp_toi", self.pp_toi.as_deref()),
            Column::opt_text("even_toi", self.even_toi.as_deref()),
            Column::float("faceoff_pct", self.faceoff_pct),
            Column::float("shot_pct", self.shot_pct),
            Column::opt_int("gw_goals", self.gw_goals),
            Column::opt_int("ot_goals", self.ot_goals),
            Column::opt_int("sh_goals", self.sh_goals),
            Column::opt_int("sh_points", self.sh_points),
            Column::opt_text("sh_toi", self.sh_toi.as_deref()),
            Column::opt_int("blocked_shots", self.blocked_shots),
            Column::opt_int("plus_minus", self.plus_minus),
            Column::opt_int("points", self.points),
            Column::opt_int("shifts", self.shifts),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalieSeasonStats {
    pub stint: StintKey,
    pub time_on_ice: Option<String>,
    pub games: Option<i64>,
    pub games_started: Option<i64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub ot_losses: Option<i64>,
    pub shutouts: Option<i64>,
    pub saves: Option<i64>,
    pub pp_saves: Option<i64>,
    pub sh_saves: Option<i64>,
    pub even_saves: Option<i64>,
    pub pp_shots: Option<i64>,
    pub sh_shots: Option<i64>,
    pub even_shots: Option<i64>,
    pub save_pct: Option<f64>,
    pub gaa: Option<f64>,
    pub shots_against: Option<i64>,
    pub goals_against: Option<i64>,
    pub pp_save_pct: Option<f64>,
    pub sh_save_pct: Option<f64>,
    pub even_save_pct: Option<f64>,
}

impl GoalieSeasonStats {
    pub fn from_split(stint: StintKey, split: &SeasonSplit) -> Self {
        let s = &split.stat;
        Self {
            stint,
            time_on_ice: s.time_on_ice.clone(),
            games: s.games,
            games_started: s.games_started,
            wins: s.wins,
            losses: s.losses,
            ot_losses: s.ot,
            shutouts: s.shutouts,
            saves: s.saves,
            pp_saves: s.power_play_saves,
            sh_saves: s.short_handed_saves,
            even_saves: s.even_saves,
            pp_shots: s.power_play_shots,
            sh_shots: s.short_handed_shots,
            even_shots: s.even_shots,
            save_pct: s.save_percentage,
            gaa: s.goal_against_average,
            shots_against: s.shots_against,
            goals_against: s.goals_against,
            pp_save_pct: s.power_play_save_percentage,
            sh_save_pct: s.short_handed_save_percentage,
            even_save_pct: s.even_strength_save_percentage,
        }
    }
}

impl Record for GoalieSeasonStats {
    fn table(&self) -> Table {
        Table::GoalieSeasonStats
    }

    fn key(&self) -> Vec<Column> {
        self.stint.columns()
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::opt_text("time_on_ice", self.time_on_ice.as_deref()),
            Column::opt_int("games", self.games),
            Column::opt_int("games_started", self.games_started),
            Column::opt_int("wins", self.wins),
            Column::opt_int("losses", self.losses),
            Column::opt_int("ot_losses", self.ot_losses),
            Column::opt_int("shutouts", self.shutouts),
            Column::opt_int("saves", self.saves),
            Column::opt_int("pp_saves", self.pp_saves),
            Column::opt_int("sh_saves", self.sh_saves),
            Column::opt_int("even_saves", self.even_saves),
            Column::opt_int("pp_shots", self.pp_shots),
            Column::opt_int("sh_shots", self.sh_shots),
            Column::opt_int("even_shots", self.even_shots),
            Column::float("save_pct", self.save_pct),
            Column::float("gaa", self.gaa),
            Column::opt_int("shots_against", self.shots_against),
            Column::opt_int("goals_against", self.goals_against),
            Column::float("pp_save_pct", self.pp_save_pct),
            Column::float("sh_save_pct", self.sh_save_pct),
            Column::float("even_save_pct", self.even_save_pct),
        ]
    }
}

/// Draft selection with a biographical snapshot taken at draft time.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPick {
    pub draft_year: i32,
    pub overall_pick: i64,
    pub round: i64,
    pub pick_in_round: i64,
    pub team_id: Option<i64>,
    pub prospect_id: i64,
    pub player_id: i64,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub height: Option<String>,
    pub weight: Option<i64>,
    pub shoots_catches: Option<String>,
    pub position: Option<String>,
    pub amateur_team: Option<String>,
    pub amateur_league: Option<String>,
}

impl DraftPick {
    pub fn from_prospect(
        draft_year: i32,
        overall_pick: i64,
        round: i64,
        pick_in_round: i64,
        team_id: Option<i64>,
        player_id: i64,
        p: &ApiProspect,
    ) -> Self {
        Self {
            draft_year,
            overall_pick,
            round,
            pick_in_round,
            team_id,
            prospect_id: p.id,
            player_id,
            full_name: p.full_name.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            birth_date: parse_date(p.birth_date.as_deref()),
            height: p.height.clone(),
            weight: p.weight,
            shoots_catches: p.shoots_catches.clone(),
            position: p.primary_position.as_ref().and_then(|pos| pos.name.clone()),
            amateur_team: p.amateur_team.as_ref().and_then(|t| t.name.clone()),
            amateur_league: p.amateur_league.as_ref().and_then(|l| l.name.clone()),
        }
    }
}

impl Record for DraftPick {
    fn table(&self) -> Table {
        Table::DraftPicks
    }

    fn key(&self) -> Vec<Column> {
        vec![
            Column::int("draft_year", i64::from(self.draft_year)),
            Column::int("overall_pick", self.overall_pick),
        ]
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::int("round", self.round),
            Column::int("pick_in_round", self.pick_in_round),
            Column::opt_int("team_id", self.team_id),
            Column::int("prospect_id", self.prospect_id),
            Column::int("player_id", self.player_id),
            Column::opt_text("full_name", self.full_name.as_deref()),
            Column::opt_text("first_name", self.first_name.as_deref()),
            Column::opt_text("last_name", self.last_name.as_deref()),
            Column::date("birth_date", self.birth_date),
            Column::opt_text("height", self.height.as_deref()),
            Column::opt_int("weight", self.weight),
            Column::opt_text("shoots_catches", self.shoots_catches.as_deref()),
            Column::opt_text("position", self.position.as_deref()),
            Column::opt_text("amateur_team", self.amateur_team.as_deref()),
            Column::opt_text("amateur_league", self.amateur_league.as_deref()),
        ]
    }
}

/// Junior-league season of a draftee. Keyed by the upstream sequence since junior
/// rows never share a table with roster pulls.
#[derive(Debug, Clone, PartialEq)]
pub struct JuniorSeasonStats {
    pub player_id: i64,
    pub season: String,
    pub sequence: i32,
    pub team_name: Option<String>,
    pub league_name: Option<String>,
    pub games: Option<i64>,
    pub goals: Option<i64>,
    pub assists: Option<i64>,
    pub points: Option<i64>,
    pub pim: Option<i64>,
}

impl JuniorSeasonStats {
    pub fn from_split(player_id: i64, split: &SeasonSplit) -> Self {
        Self {
            player_id,
            season: split.season.clone(),
            sequence: split.sequence_number,
            team_name: split.team.name.clone(),
            league_name: split.league.name.clone(),
            games: split.stat.games,
            goals: split.stat.goals,
            assists: split.stat.assists,
            points: split.stat.points,
            pim: split.stat.pim,
        }
    }
}

impl Record for JuniorSeasonStats {
    fn table(&self) -> Table {
        Table::JuniorSeasonStats
    }

    fn key(&self) -> Vec<Column> {
        vec![
            Column::int("player_id", self.player_id),
            Column::text("season", &self.season),
            Column::int("sequence", i64::from(self.sequence)),
        ]
    }

    fn values(&self) -> Vec<Column> {
        vec![
            Column::opt_text("team_name", self.team_name.as_deref()),
            Column::opt_text("league_name", self.league_name.as_deref()),
            Column::opt_int("games", self.games),
            Column::opt_int("goals", self.goals),
            Column::opt_int("assists", self.assists),
            Column::opt_int("points", self.points),
            Column::opt_int("pim", self.pim),
        ]
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}
