use tracing::{info, instrument, warn};

use crate::api::models::{first, payload, ApiPerson, RosterEntry, SeasonSplit, StatsBlock};
use crate::config::Selection;
use crate::context::PullContext;
use crate::database_ops::records::{Player, StintKey, TeamPlayer};
use crate::database_ops::TeamRef;
use crate::error::{unresolved, PullError};
use crate::ingest::PullSummary;
use crate::reconcile::{reconcile_record, resolve_sequence};

/// Pulls the roster of every selected team already in the database, storing each
/// player and their current-season stint at that team.
#[instrument(skip(ctx))]
pub async fn pull_rosters(
    ctx: &PullContext<'_>,
    selection: &Selection,
) -> Result<PullSummary, PullError> {
    let teams = ctx.store.teams(selection.ids()).await?;
    let mut summary = PullSummary::default();

    for team in &teams {
        info!(team_id = team.id, name = %team.name, "pulling roster");
        let body = ctx.api.get_json(&ctx.endpoints.roster(team.id)).await?;
        let roster: Vec<RosterEntry> = match payload(body, "roster") {
            Ok(roster) => roster,
            Err(err) => {
                summary.absorb("roster", err.into())?;
                continue;
            }
        };
        for entry in roster {
            if let Err(err) = pull_roster_player(ctx, team, entry.person.id, &mut summary).await {
                summary.absorb("player", err)?;
            }
        }
    }
    Ok(summary)
}

async fn pull_roster_player(
    ctx: &PullContext<'_>,
    team: &TeamRef,
    player_id: i64,
    summary: &mut PullSummary,
) -> Result<(), PullError> {
    let body = ctx.api.get_json(&ctx.endpoints.person(player_id)).await?;
    let person: ApiPerson = first(body, "people").map_err(unresolved("player", player_id))?;
    let player = Player::from(&person);
    info!(player_id, name = %player.full_name, "loading player");
    summary.record(reconcile_record(ctx.store, &player).await?);

    let body = ctx.api.get_json(&ctx.endpoints.year_by_year(player_id)).await?;
    let block: StatsBlock = first(body, "stats").map_err(unresolved("player", player_id))?;
    let Some(current) = current_stint(&block.splits, ctx, team.id) else {
        warn!(
            player_id,
            team_id = team.id,
            season = ctx.season,
            "no current-season stint at this team; not added to team_players"
        );
        summary.skipped += 1;
        return Ok(());
    };

    let sequence =
        resolve_sequence(ctx.store, player_id, team.id, ctx.season, current.sequence).await?;
    let stint = TeamPlayer {
        stint: StintKey {
            player_id,
            team_id: team.id,
            season: ctx.season.to_string(),
            sequence,
        },
        active: player.active && current.is_last,
    };
    summary.record(reconcile_record(ctx.store, &stint).await?);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CurrentStint {
    sequence: i32,
    /// Whether no later eligible stint follows it in the player's history.
    is_last: bool,
}

/// The player's latest current-season, eligible-league stint at `team_id`.
fn current_stint(
    splits: &[SeasonSplit],
    ctx: &PullContext<'_>,
    team_id: i64,
) -> Option<CurrentStint> {
    let eligible: Vec<&SeasonSplit> = splits
        .iter()
        .filter(|s| ctx.is_eligible_league(s.league_name()))
        .collect();
    let index = eligible
        .iter()
        .rposition(|s| s.season == ctx.season && s.team.id == Some(team_id))?;
    Some(CurrentStint {
        sequence: eligible[index].sequence_number,
        is_last: index + 1 == eligible.len(),
    })
}
