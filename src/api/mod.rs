// Client side of the NHL stats API: transport, endpoints and payload models.

pub mod client;
pub mod models;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::Links;

pub use client::{retry_on_timeout, HttpApi, RetryPolicy};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} timed out on all {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response has no '{key}' payload")]
    MissingPayload { key: &'static str },
    #[error("could not decode '{key}' payload")]
    Decode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether the run must stop. Payload problems only affect one entity.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ApiError::MissingPayload { .. } | ApiError::Decode { .. }
        )
    }
}

#[async_trait]
pub trait NhlApi: Send + Sync {
    /// GET `url` and return the decoded JSON body.
    async fn get_json(&self, url: &str) -> Result<Value, ApiError>;
}

/// URL builder over the configured `[links]`.
#[derive(Debug, Clone)]
pub struct Endpoints {
    site: String,
    teams: String,
    players: String,
    draft: String,
    prospects: String,
    year_by_year: String,
}

impl Endpoints {
    pub fn new(links: &Links, year_by_year: &str) -> Self {
        let draft = trim(&links.draft);
        let prospects = links
            .prospects
            .as_deref()
            .map(trim)
            .unwrap_or_else(|| format!("{draft}/prospects"));
        Self {
            site: trim(&links.site),
            teams: trim(&links.teams),
            players: trim(&links.players),
            draft,
            prospects,
            year_by_year: year_by_year.trim_start_matches('/').to_string(),
        }
    }

    pub fn teams(&self) -> String {
        self.teams.clone()
    }

    pub fn team(&self, team_id: i64) -> String {
        format!("{}/{team_id}", self.teams)
    }

    pub fn roster(&self, team_id: i64) -> String {
        format!("{}/{team_id}/roster", self.teams)
    }

    pub fn person(&self, player_id: i64) -> String {
        format!("{}/{player_id}", self.players)
    }

    pub fn year_by_year(&self, player_id: i64) -> String {
        format!("{}/{player_id}/{}", self.players, self.year_by_year)
    }

    pub fn draft(&self, year: i32) -> String {
        format!("{}/{year}", self.draft)
    }

    /// Prospect URL, preferring the relative `link` carried by the draft pick.
    pub fn prospect(&self, prospect_id: i64, link: Option<&str>) -> String {
        match link {
            Some(link) if !link.trim().is_empty() => {
                format!("{}/{}", self.site, link.trim().trim_start_matches('/'))
            }
            _ => format!("{}/{prospect_id}", self.prospects),
        }
    }
}

fn trim(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> Links {
        Links {
            site: "https://statsapi.web.nhl.com/".into(),
            teams: "https://statsapi.web.nhl.com/api/v1/teams".into(),
            players: "https://statsapi.web.nhl.com/api/v1/people/".into(),
            draft: "https://statsapi.web.nhl.com/api/v1/draft".into(),
            prospects: None,
        }
    }

    #[test]
    fn endpoints_join_cleanly() {
        let e = Endpoints::new(&links(), "/stats?stats=yearByYear");
        assert_eq!(e.roster(10), "https://statsapi.web.nhl.com/api/v1/teams/10/roster");
        assert_eq!(
            e.year_by_year(8478402),
            "https://statsapi.web.nhl.com/api/v1/people/8478402/stats?stats=yearByYear"
        );
        assert_eq!(e.draft(2022), "https://statsapi.web.nhl.com/api/v1/draft/2022");
    }

    #[test]
    fn prospect_prefers_relative_link() {
        let e = Endpoints::new(&links(), "stats?stats=yearByYear");
        assert_eq!(
            e.prospect(5, Some("/api/v1/draft/prospects/5")),
            "https://statsapi.web.nhl.com/api/v1/draft/prospects/5"
        );
        assert_eq!(
            e.prospect(5, None),
            "https://statsapi.web.nhl.com/api/v1/draft/prospects/5"
        );
    }

    #[test]
    fn only_transport_errors_are_fatal() {
        assert!(ApiError::Status { url: "u".into(), status: 500 }.is_fatal());
        assert!(ApiError::RetriesExhausted { url: "u".into(), attempts: 3 }.is_fatal());
        assert!(!ApiError::MissingPayload { key: "people" }.is_fatal());
    }
}
