// Pull stages, run in a fixed order by `run`.

pub mod draft;
pub mod roster;
pub mod season_stats;
pub mod teams;

use std::fmt;

use tracing::{error, info, warn};

use crate::config::Settings;
use crate::context::PullContext;
use crate::database_ops::PositionGroup;
use crate::error::PullError;
use crate::reconcile::Outcome;

/// Per-stage and whole-run counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PullSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Updated => self.updated += 1,
        }
    }

    pub fn merge(&mut self, other: PullSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Counts a per-entity failure and lets the batch continue, unless it is fatal.
    pub fn absorb(&mut self, entity: &str, err: PullError) -> Result<(), PullError> {
        match err {
            err if err.is_fatal() => Err(err),
            PullError::Store(err) => {
                error!(entity, error = %format!("{err:#}"), "write failed; continuing");
                self.failed += 1;
                Ok(())
            }
            err => {
                warn!(entity, error = %err, "skipping");
                self.skipped += 1;
                Ok(())
            }
        }
    }
}

impl fmt::Display for PullSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} updated={} skipped={} failed={}",
            self.inserted, self.updated, self.skipped, self.failed
        )
    }
}

/// Runs every enabled stage in order: teams, rosters, skater stats, goalie stats, draft.
pub async fn run(ctx: &PullContext<'_>, settings: &Settings) -> Result<PullSummary, PullError> {
    let mut total = PullSummary::default();

    if settings.teams.select.is_enabled() {
        let summary = teams::pull_teams(ctx, &settings.teams.select).await?;
        info!(%summary, "teams done");
        total.merge(summary);
    }
    if settings.players.teams.is_enabled() {
        let summary = roster::pull_rosters(ctx, &settings.players.teams).await?;
        info!(%summary, "rosters done");
        total.merge(summary);
    }
    if settings.stats.skaters.is_enabled() {
        let summary =
            season_stats::pull_season_stats(ctx, PositionGroup::Skaters, &settings.stats.skaters)
                .await?;
        info!(%summary, "skater stats done");
        total.merge(summary);
    }
    if settings.stats.goalies.is_enabled() {
        let summary =
            season_stats::pull_season_stats(ctx, PositionGroup::Goalies, &settings.stats.goalies)
                .await?;
        info!(%summary, "goalie stats done");
        total.merge(summary);
    }
    if let Some(year) = settings.draft.year {
        let summary = draft::pull_draft(ctx, year, &settings.draft.junior_leagues).await?;
        info!(%summary, "draft done");
        total.merge(summary);
    }

    info!(summary = %total, "pull finished");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::database_ops::Table;
    use crate::testing::{
        int_of, person_json, roster_json, split_json, team_json, text_of, year_by_year_json,
        Fixture, SEASON,
    };
    use serde_json::json;

    const CONFIG: &str = r#"
        [general]
        season = "20222023"

        [links]
        site = "https://nhl.test"
        teams = "https://nhl.test/api/v1/teams"
        players = "https://nhl.test/api/v1/people"
        draft = "https://nhl.test/api/v1/draft"

        [database]
        user = "nhl"
        name = "nhl"

        [teams]
        select = "ALL"

        [players]
        teams = "ALL"

        [stats]
        skaters = "ALL"
        goalies = "NONE"
    "#;

    #[test]
    fn local_errors_are_counted_fatal_ones_returned() {
        let mut summary = PullSummary::default();
        summary
            .absorb("team", PullError::from(anyhow::anyhow!("rolled back")))
            .unwrap();
        summary
            .absorb(
                "player",
                PullError::Unresolved {
                    entity: "player",
                    id: 1,
                    reason: "not found upstream",
                },
            )
            .unwrap();
        let fatal = summary.absorb(
            "roster",
            PullError::from(ApiError::RetriesExhausted {
                url: "u".into(),
                attempts: 3,
            }),
        );

        assert!(fatal.is_err());
        assert_eq!((summary.failed, summary.skipped), (1, 1));
    }

    #[tokio::test]
    async fn full_run_is_idempotent() {
        let settings = Settings::parse(CONFIG).unwrap();
        let fx = Fixture::new();
        let nhl = crate::config::NHL_LEAGUE;
        fx.api.respond(
            &fx.endpoints.teams(),
            json!({
                "copyright": "NHL",
                "teams": [team_json(10, "Team A"), team_json(20, "Team B")]
            }),
        );
        fx.api.respond(&fx.endpoints.roster(10), roster_json(&[]));
        fx.api.respond(&fx.endpoints.roster(20), roster_json(&[7]));
        fx.api.respond(
            &fx.endpoints.person(7),
            json!({"people": [person_json(7, "Jane Doe", "C", true)]}),
        );
        fx.api.respond(
            &fx.endpoints.year_by_year(7),
            year_by_year_json(vec![
                split_json("20212022", 10, nhl, 1, json!({"games": 80, "goals": 20})),
                split_json(SEASON, 10, nhl, 1, json!({"games": 40, "goals": 9})),
                split_json(SEASON, 20, nhl, 1, json!({"games": 38, "goals": 11})),
                split_json(SEASON, 99, "Swedish Hockey League", 1, json!({"games": 3})),
            ]),
        );
        let ctx = fx.ctx();

        let first = run(&ctx, &settings).await.unwrap();
        let teams = fx.store.count(Table::Teams);
        let stints = fx.store.rows(Table::TeamPlayers);
        let stats = fx.store.rows(Table::SkaterSeasonStats);
        let second = run(&ctx, &settings).await.unwrap();

        assert_eq!(first.failed, 0);
        assert_eq!(second.inserted, 0);
        assert_eq!(teams, 2);
        assert_eq!(stints.len(), 3);
        assert_eq!(stats.len(), 3);
        assert_eq!(fx.store.count(Table::Teams), teams);
        assert_eq!(fx.store.count(Table::TeamPlayers), stints.len());
        assert_eq!(fx.store.count(Table::SkaterSeasonStats), stats.len());
        assert_eq!(fx.store.count(Table::GoalieSeasonStats), 0);

        // the roster stage claims sequence 1 for the current team before stats run
        let mut numbering: Vec<(i64, String, i64)> = stints
            .iter()
            .map(|r| {
                (
                    int_of(r, "team_id").unwrap(),
                    text_of(r, "season").unwrap(),
                    int_of(r, "sequence").unwrap(),
                )
            })
            .collect();
        numbering.sort();
        assert_eq!(
            numbering,
            vec![
                (10, "20212022".to_string(), 1),
                (10, SEASON.to_string(), 2),
                (20, SEASON.to_string(), 1),
            ]
        );
    }
}
