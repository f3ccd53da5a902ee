use std::collections::HashSet;

use anyhow::{bail, Result};
use tracing::debug;

use crate::database_ops::Store;

/// Upper bound on stints per player and season; anything past it is bad data.
const MAX_SEQUENCE: i32 = 64;

/// Assigns collision-free stint sequence numbers.
///
/// A candidate is kept when it is unused or already belongs to the same
/// `(player, team, season)` stint, so reruns land on the rows they wrote last time.
/// It is bumped when another team holds it in the store, or when an earlier stint
/// of the same batch claimed it.
#[derive(Debug, Default)]
pub struct SequenceDisambiguator {
    claimed: HashSet<(i64, String, i32)>,
}

impl SequenceDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &mut self,
        store: &dyn Store,
        player_id: i64,
        team_id: i64,
        season: &str,
        candidate: i32,
    ) -> Result<i32> {
        let mut sequence = candidate.max(1);
        loop {
            if sequence > MAX_SEQUENCE {
                bail!(
                    "no free stint sequence for player {player_id} in {season} (started at {candidate})"
                );
            }
            let key = (player_id, season.to_string(), sequence);
            let taken = if self.claimed.contains(&key) {
                true
            } else {
                matches!(
                    store.stint_team(player_id, season, sequence).await?,
                    Some(holder) if holder != team_id
                )
            };
            if !taken {
                self.claimed.insert(key);
                if sequence != candidate {
                    debug!(
                        player_id,
                        team_id,
                        season,
                        candidate,
                        sequence,
                        "stint sequence bumped"
                    );
                }
                return Ok(sequence);
            }
            sequence += 1;
        }
    }
}

/// One-off resolution outside a batch.
pub async fn resolve_sequence(
    store: &dyn Store,
    player_id: i64,
    team_id: i64,
    season: &str,
    candidate: i32,
) -> Result<i32> {
    SequenceDisambiguator::new()
        .resolve(store, player_id, team_id, season, candidate)
        .await
}

/// Active flag for each of a player's stints, in stint order. Only the final stint
/// can be active, and only when it belongs to `current_season`.
pub fn derive_active_flags<S: AsRef<str>>(seasons: &[S], current_season: &str) -> Vec<bool> {
    let last = seasons.len().checked_sub(1);
    seasons
        .iter()
        .enumerate()
        .map(|(i, season)| Some(i) == last && season.as_ref() == current_season)
        .collect()
}
