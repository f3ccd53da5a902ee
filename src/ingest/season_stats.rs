use tracing::{debug, info, instrument};

use crate::api::models::{first, SeasonSplit, StatsBlock};
use crate::config::Selection;
use crate::context::PullContext;
use crate::database_ops::records::{GoalieSeasonStats, SkaterSeasonStats, StintKey, TeamPlayer};
use crate::database_ops::PositionGroup;
use crate::error::{unresolved, PullError};
use crate::ingest::PullSummary;
use crate::reconcile::{
    derive_active_flags, ensure_parent_exists, reconcile_record, Parent, SequenceDisambiguator,
};

/// Pulls year-by-year stats for the selected players of `group`.
///
/// `ALL` means every player of the group that already holds a stint.
#[instrument(skip(ctx, selection))]
pub async fn pull_season_stats(
    ctx: &PullContext<'_>,
    group: PositionGroup,
    selection: &Selection,
) -> Result<PullSummary, PullError> {
    let players = match selection.ids() {
        Some(ids) => ids.to_vec(),
        None => ctx.store.rostered_players(group).await?,
    };
    info!(%group, players = players.len(), "pulling year-by-year stats");

    let mut summary = PullSummary::default();
    for player_id in players {
        if let Err(err) = pull_player_seasons(ctx, group, player_id, &mut summary).await {
            summary.absorb("player", err)?;
        }
    }
    Ok(summary)
}

async fn pull_player_seasons(
    ctx: &PullContext<'_>,
    group: PositionGroup,
    player_id: i64,
    summary: &mut PullSummary,
) -> Result<(), PullError> {
    let body = ctx.api.get_json(&ctx.endpoints.year_by_year(player_id)).await?;
    let block: StatsBlock = first(body, "stats").map_err(unresolved("player", player_id))?;
    let splits: Vec<&SeasonSplit> = block
        .splits
        .iter()
        .filter(|s| ctx.is_eligible_league(s.league_name()))
        .collect();
    debug!(player_id, seasons = splits.len(), "eligible seasons");
    if splits.is_empty() {
        return Ok(());
    }

    ensure_parent_exists(ctx, Parent::Player(player_id)).await?;

    let seasons: Vec<&str> = splits.iter().map(|s| s.season.as_str()).collect();
    let active = derive_active_flags(&seasons, ctx.season);
    let mut sequences = SequenceDisambiguator::new();
    for (split, active) in splits.into_iter().zip(active) {
        let stored = store_season(ctx, group, player_id, split, active, &mut sequences, summary);
        if let Err(err) = stored.await {
            summary.absorb("season", err)?;
        }
    }
    Ok(())
}

async fn store_season(
    ctx: &PullContext<'_>,
    group: PositionGroup,
    player_id: i64,
    split: &SeasonSplit,
    active: bool,
    sequences: &mut SequenceDisambiguator,
    summary: &mut PullSummary,
) -> Result<(), PullError> {
    let team_id = split.team.id.ok_or(PullError::MissingField {
        entity: "season split",
        field: "team id",
    })?;
    ensure_parent_exists(ctx, Parent::Team(team_id)).await?;

    let sequence = sequences
        .resolve(ctx.store, player_id, team_id, &split.season, split.sequence_number)
        .await?;
    let stint = StintKey {
        player_id,
        team_id,
        season: split.season.clone(),
        sequence,
    };
    let bridge = TeamPlayer {
        stint: stint.clone(),
        active,
    };
    summary.record(reconcile_record(ctx.store, &bridge).await?);
    ensure_parent_exists(ctx, Parent::Stint(&bridge)).await?;

    let outcome = match group {
        PositionGroup::Skaters => {
            reconcile_record(ctx.store, &SkaterSeasonStats::from_split(stint, split)).await?
        }
        PositionGroup::Goalies => {
            reconcile_record(ctx.store, &GoalieSeasonStats::from_split(stint, split)).await?
        }
    };
    info!(player_id, team_id, season = %split.season, sequence, ?outcome, "season stats stored");
    summary.record(outcome);
    Ok(())
}
