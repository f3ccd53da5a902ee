use tracing::{info, instrument};

use crate::api::models::{first, ApiPerson, ApiTeam};
use crate::context::PullContext;
use crate::database_ops::records::{Player, Team, TeamPlayer};
use crate::database_ops::{Column, Record, Table};
use crate::error::{unresolved, PullError};

/// A row that must exist before a dependent row is written.
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    Team(i64),
    Player(i64),
    Stint(&'a TeamPlayer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Present,
    Created,
}

/// Makes sure `parent` is stored, fetching teams and players from the API when they
/// are missing. Fails with [`PullError::Unresolved`] when upstream has no such entity.
#[instrument(skip(ctx))]
pub async fn ensure_parent_exists(
    ctx: &PullContext<'_>,
    parent: Parent<'_>,
) -> Result<Materialized, PullError> {
    match parent {
        Parent::Team(id) => {
            if ctx.store.exists(Table::Teams, &[Column::int("id", id)]).await? {
                return Ok(Materialized::Present);
            }
            let body = ctx.api.get_json(&ctx.endpoints.team(id)).await?;
            let team: ApiTeam = first(body, "teams").map_err(unresolved("team", id))?;
            let team = Team::from(&team);
            info!(team_id = id, name = %team.name, "materializing missing team");
            ctx.store.insert(Table::Teams, &team.columns()).await?;
            Ok(Materialized::Created)
        }
        Parent::Player(id) => {
            if ctx.store.exists(Table::Players, &[Column::int("id", id)]).await? {
                return Ok(Materialized::Present);
            }
            let body = ctx.api.get_json(&ctx.endpoints.person(id)).await?;
            let person: ApiPerson = first(body, "people").map_err(unresolved("player", id))?;
            let player = Player::from(&person);
            info!(player_id = id, name = %player.full_name, "materializing missing player");
            ctx.store.insert(Table::Players, &player.columns()).await?;
            Ok(Materialized::Created)
        }
        Parent::Stint(stint) => {
            if ctx.store.exists(stint.table(), &stint.key()).await? {
                return Ok(Materialized::Present);
            }
            info!(stint = ?stint.stint, "materializing missing stint");
            ctx.store.insert(stint.table(), &stint.columns()).await?;
            Ok(Materialized::Created)
        }
    }
}
