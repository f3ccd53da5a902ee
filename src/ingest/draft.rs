use tracing::{info, instrument, warn};

use crate::api::models::{first, ApiDraftPick, ApiProspect, Draft, StatsBlock};
use crate::context::PullContext;
use crate::database_ops::records::{DraftPick, JuniorSeasonStats};
use crate::error::{unresolved, PullError};
use crate::ingest::PullSummary;
use crate::reconcile::{ensure_parent_exists, reconcile_record, Parent};

/// Stores every pick of the `year` draft whose prospect has reached the NHL, plus the
/// draftee's seasons in `junior_leagues` when any are configured.
#[instrument(skip(ctx, junior_leagues))]
pub async fn pull_draft(
    ctx: &PullContext<'_>,
    year: i32,
    junior_leagues: &[String],
) -> Result<PullSummary, PullError> {
    let body = ctx.api.get_json(&ctx.endpoints.draft(year)).await?;
    let draft: Draft = first(body, "drafts")?;

    let mut summary = PullSummary::default();
    if let Some(returned) = draft.draft_year.filter(|&y| y != i64::from(year)) {
        warn!(requested = year, returned, "draft endpoint answered for another year; skipping");
        summary.skipped += 1;
        return Ok(summary);
    }
    for pick in draft.rounds.iter().flat_map(|round| round.picks.iter()) {
        if let Err(err) = pull_pick(ctx, year, pick, junior_leagues, &mut summary).await {
            summary.absorb("draft pick", err)?;
        }
    }
    Ok(summary)
}

async fn pull_pick(
    ctx: &PullContext<'_>,
    year: i32,
    pick: &ApiDraftPick,
    junior_leagues: &[String],
    summary: &mut PullSummary,
) -> Result<(), PullError> {
    let prospect_ref = pick.prospect.as_ref().ok_or(PullError::MissingField {
        entity: "draft pick",
        field: "prospect",
    })?;
    info!(
        overall = pick.pick_overall,
        name = prospect_ref.full_name.as_deref().unwrap_or_default(),
        "checking draft pick"
    );

    let url = ctx
        .endpoints
        .prospect(prospect_ref.id, prospect_ref.link.as_deref());
    let body = ctx.api.get_json(&url).await?;
    let prospect: ApiProspect =
        first(body, "prospects").map_err(unresolved("prospect", prospect_ref.id))?;
    let player_id = prospect.nhl_player_id.ok_or(PullError::Unresolved {
        entity: "prospect",
        id: prospect.id,
        reason: "no NHL player id",
    })?;

    let team_id = pick.team.as_ref().and_then(|t| t.id);
    if let Some(team_id) = team_id {
        ensure_parent_exists(ctx, Parent::Team(team_id)).await?;
    }
    ensure_parent_exists(ctx, Parent::Player(player_id)).await?;

    let record = DraftPick::from_prospect(
        year,
        pick.pick_overall,
        pick.round,
        pick.pick_in_round,
        team_id,
        player_id,
        &prospect,
    );
    summary.record(reconcile_record(ctx.store, &record).await?);

    if !junior_leagues.is_empty() {
        pull_junior_seasons(ctx, player_id, junior_leagues, summary).await?;
    }
    Ok(())
}

async fn pull_junior_seasons(
    ctx: &PullContext<'_>,
    player_id: i64,
    junior_leagues: &[String],
    summary: &mut PullSummary,
) -> Result<(), PullError> {
    let body = ctx.api.get_json(&ctx.endpoints.year_by_year(player_id)).await?;
    let block: StatsBlock = first(body, "stats").map_err(unresolved("player", player_id))?;
    for split in block
        .splits
        .iter()
        .filter(|s| junior_leagues.iter().any(|l| l == s.league_name()))
    {
        let row = JuniorSeasonStats::from_split(player_id, split);
        match reconcile_record(ctx.store, &row).await {
            Ok(outcome) => summary.record(outcome),
            Err(err) => summary.absorb("junior season", err.into())?,
        }
    }
    Ok(())
}
