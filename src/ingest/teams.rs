use tracing::{info, instrument};

use crate::api::models::{payload, ApiTeam};
use crate::config::Selection;
use crate::context::PullContext;
use crate::database_ops::records::Team;
use crate::error::PullError;
use crate::ingest::PullSummary;
use crate::reconcile::reconcile_record;

/// Fetches the league's team list and reconciles every selected team.
#[instrument(skip(ctx))]
pub async fn pull_teams(
    ctx: &PullContext<'_>,
    selection: &Selection,
) -> Result<PullSummary, PullError> {
    let body = ctx.api.get_json(&ctx.endpoints.teams()).await?;
    let teams: Vec<ApiTeam> = payload(body, "teams")?;

    let mut summary = PullSummary::default();
    for api_team in teams.iter().filter(|t| selection.includes(t.id)) {
        let team = Team::from(api_team);
        info!(team_id = team.id, name = %team.name, "loading team");
        match reconcile_record(ctx.store, &team).await {
            Ok(outcome) => summary.record(outcome),
            Err(err) => summary.absorb("team", err.into())?,
        }
    }
    Ok(summary)
}
