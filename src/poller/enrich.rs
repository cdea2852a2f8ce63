//! Fill roster entries with full player profiles.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::aoe4::{Aoe4Api, Game, ProfileId};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// The snapshot already embedded the profile.
    AlreadyPresent,
    Fetched,
    /// The entry keeps its snapshot-level fields only.
    Failed(String),
    /// Nothing to look up, the entry has no profile id.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub team: usize,
    pub slot: usize,
    pub profile_id: Option<ProfileId>,
    pub outcome: EnrichmentOutcome,
}

#[derive(Debug, Clone)]
pub struct EnrichedGame {
    pub game: Game,
    pub outcomes: Vec<EntryOutcome>,
}

impl EnrichedGame {
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, EnrichmentOutcome::Failed(_)))
    }
}

/// Fetch the profile of every roster entry lacking one, concurrently.
///
/// Each lookup settles on its own; a failure never affects other entries.
pub async fn enrich_game<A: Aoe4Api + ?Sized>(api: &A, mut game: Game) -> EnrichedGame {
    let lookups = game.teams().iter().enumerate().flat_map(|(team, t)| {
        t.players.iter().enumerate().map(move |(slot, p)| {
            let profile_id = p.profile_id.clone();
            let present = p.player.is_some();
            async move {
                let result = match (&profile_id, present) {
                    (_, true) => None,
                    (None, false) => Some(Err(None)),
                    (Some(id), false) => Some(api.get_player(id).await.map_err(Some)),
                };
                (team, slot, profile_id, result)
            }
        })
    });

    let settled = join_all(lookups).await;

    let mut outcomes = Vec::with_capacity(settled.len());
    for (team, slot, profile_id, result) in settled {
        let outcome = match result {
            None => EnrichmentOutcome::AlreadyPresent,
            Some(Ok(player)) => {
                game.teams_mut()[team].players[slot].player = Some(player);
                EnrichmentOutcome::Fetched
            }
            Some(Err(None)) => EnrichmentOutcome::Skipped,
            Some(Err(Some(e))) => {
                warn!(
                    error = %e,
                    profile_id = ?profile_id.as_ref().map(ToString::to_string),
                    game_id = %game.game_id,
                    "🔄 ⚠️ Failed to fetch player details"
                );
                EnrichmentOutcome::Failed(e.user_message())
            }
        };
        outcomes.push(EntryOutcome {
            team,
            slot,
            profile_id,
            outcome,
        });
    }

    debug!(
        game_id = %game.game_id,
        fetched = outcomes
            .iter()
            .filter(|o| o.outcome == EnrichmentOutcome::Fetched)
            .count(),
        "🔄 Roster enriched"
    );

    EnrichedGame { game, outcomes }
}
