//! Run configuration, read from the TOML file named on the command line.
//!
//! ```toml
//! [general]
//! season = "20222023"
//! log_dir = "/var/log/nhl"
//!
//! [links]
//! site = "https://statsapi.web.nhl.com"
//! teams = "https://statsapi.web.nhl.com/api/v1/teams"
//! players = "https://statsapi.web.nhl.com/api/v1/people"
//! draft = "https://statsapi.web.nhl.com/api/v1/draft"
//!
//! [database]
//! user = "nhl"
//! password = "secret"
//! host = "localhost"
//! name = "hockey"
//!
//! [teams]
//! select = "ALL"
//!
//! [stats]
//! skaters = "8478402 8471214"
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::util::env::{env_flag, env_opt, env_parse};

pub const NHL_LEAGUE: &str = "National Hockey League";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub general: GeneralSettings,
    pub links: Links,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub teams: TeamsSection,
    #[serde(default)]
    pub players: PlayersSection,
    #[serde(default)]
    pub stats: StatsSection,
    #[serde(default)]
    pub draft: DraftSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSettings {
    /// Season label in the upstream format, e.g. `20222023`.
    pub season: String,
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    /// Host prefix for the relative `link` fields found in payloads.
    pub site: String,
    pub teams: String,
    pub players: String,
    pub draft: String,
    pub prospects: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Full DSN; takes precedence over the individual fields when set.
    pub url: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Total tries per request, the first one included.
    pub attempts: u32,
    pub timeout_secs: u64,
    /// Constant pause between tries; it does not grow.
    pub retry_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout_secs: 30,
            retry_delay_ms: 500,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamsSection {
    pub select: Selection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayersSection {
    /// Teams whose rosters are pulled.
    pub teams: Selection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsSection {
    pub skaters: Selection,
    pub goalies: Selection,
    /// Leagues whose seasons are persisted as NHL stints.
    pub leagues: Vec<String>,
    /// Path and query appended to a person URL for season-by-season splits.
    pub year_by_year: String,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            skaters: Selection::None,
            goalies: Selection::None,
            leagues: vec![NHL_LEAGUE.to_string()],
            year_by_year: "stats?stats=yearByYear".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftSection {
    pub year: Option<i32>,
    pub junior_leagues: Vec<String>,
}

/// Which entities a stage processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSelection")]
pub enum Selection {
    #[default]
    None,
    All,
    Ids(Vec<i64>),
}

impl Selection {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Selection::None)
    }

    /// `None` means no restriction.
    pub fn ids(&self) -> Option<&[i64]> {
        match self {
            Selection::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn includes(&self, id: i64) -> bool {
        match self {
            Selection::None => false,
            Selection::All => true,
            Selection::Ids(ids) => ids.contains(&id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Text(String),
    Ids(Vec<i64>),
}

impl TryFrom<RawSelection> for Selection {
    type Error = String;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Ids(ids) if ids.is_empty() => Ok(Selection::None),
            RawSelection::Ids(ids) => Ok(Selection::Ids(ids)),
            RawSelection::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NONE") {
                    return Ok(Selection::None);
                }
                if trimmed.eq_ignore_ascii_case("ALL") {
                    return Ok(Selection::All);
                }
                trimmed
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse::<i64>()
                            .map_err(|_| format!("invalid id '{part}' in selection"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Selection::Ids)
            }
        }
    }
}

fn default_log_filter() -> String {
    "info,sqlx=warn".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut settings = Self::parse(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(season) = env_opt("NHL_SEASON") {
            self.general.season = season.trim().to_string();
        }
        if let Some(url) = env_opt("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(password) = env_opt("NHL_DB_PASSWORD") {
            self.database.password = password;
        }
        self.database.auto_migrate = env_flag("AUTO_MIGRATE", self.database.auto_migrate);
        self.http.attempts = env_parse("NHL_HTTP_ATTEMPTS", self.http.attempts);
    }

    pub fn validate(&self) -> Result<()> {
        validate_season(&self.general.season)?;
        if self.http.attempts == 0 {
            bail!("http.attempts must be at least 1");
        }
        if self.database.url.is_none() && self.database.name.trim().is_empty() {
            bail!("database.name (or database.url / DATABASE_URL) must be set");
        }
        if self.stats.leagues.is_empty()
            && (self.stats.skaters.is_enabled() || self.stats.goalies.is_enabled())
        {
            bail!("stats.leagues must name at least one league when stats are pulled");
        }
        Ok(())
    }
}

/// Season labels are two consecutive years, e.g. `20222023`.
pub fn validate_season(season: &str) -> Result<()> {
    if season.len() != 8 || !season.bytes().all(|b| b.is_ascii_digit()) {
        bail!("season '{season}' must be eight digits like 20222023");
    }
    let start: u32 = season[..4].parse()?;
    let end: u32 = season[4..].parse()?;
    if end != start + 1 {
        bail!("season '{season}' must span consecutive years");
    }
    Ok(())
}
