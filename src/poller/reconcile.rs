//! Pure transition logic between two consecutive latest-game snapshots.

use crate::aoe4::{Game, TeamPlayer};

/// What the poller knows between two fetches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilerState {
    /// Raw snapshot of the previous fetch, the next fetch is compared to it.
    pub last_snapshot: Option<Game>,
    /// Match exposed to observers, enriched once player details resolve.
    pub current_match: Option<Game>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    /// A game with a new id showed up. Carries the raw snapshot.
    GameStarted(Game),
    /// The same game went from ongoing to finished. Carries the raw snapshot.
    GameEnded(Game),
    /// The API has no game anymore and the held match was dropped.
    Cleared,
}

/// Compare `latest` against the previous snapshot and derive the next state.
///
/// On [`MatchEvent::GameStarted`] the current match becomes the raw
/// snapshot; the caller installs the enriched version later through
/// [`ReconcilerState::install_enriched`].
pub fn reconcile(state: ReconcilerState, latest: Option<Game>) -> (ReconcilerState, Vec<MatchEvent>) {
    let ReconcilerState {
        last_snapshot,
        current_match,
    } = state;

    let Some(latest) = latest else {
        let events = if current_match.is_some() {
            vec![MatchEvent::Cleared]
        } else {
            Vec::new()
        };
        return (ReconcilerState::default(), events);
    };

    let previous_id = last_snapshot.as_ref().map(|g| &g.game_id);
    let was_ongoing = last_snapshot.as_ref().is_some_and(|g| g.ongoing);

    let (current_match, events) = if previous_id != Some(&latest.game_id) {
        (
            Some(latest.clone()),
            vec![MatchEvent::GameStarted(latest.clone())],
        )
    } else if was_ongoing && !latest.ongoing {
        let merged = match &current_match {
            Some(current) => merge_finished(current, latest.clone()),
            None => latest.clone(),
        };
        (Some(merged), vec![MatchEvent::GameEnded(latest.clone())])
    } else {
        (current_match, Vec::new())
    };

    (
        ReconcilerState {
            last_snapshot: Some(latest),
            current_match,
        },
        events,
    )
}

/// Top-level fields come from the finishing snapshot, player profiles
/// already resolved on `current` are carried over by profile id.
pub fn merge_finished(current: &Game, mut finished: Game) -> Game {
    let resolved: Vec<&TeamPlayer> = current.players().filter(|p| p.player.is_some()).collect();

    for entry in finished.teams_mut().iter_mut().flat_map(|t| t.players.iter_mut()) {
        if entry.player.is_some() {
            continue;
        }
        let Some(id) = entry.profile_id.as_ref() else {
            continue;
        };
        if let Some(known) = resolved.iter().find(|p| p.is(id)) {
            entry.player = known.player.clone();
        }
    }

    finished
}

impl ReconcilerState {
    /// Replace the current match with its enriched version, unless another
    /// game has taken its place in the meantime.
    pub fn install_enriched(&mut self, enriched: Game) -> bool {
        match &self.current_match {
            Some(current) if current.game_id == enriched.game_id => {
                // The game may have ended while enrichment was running.
                let merged = merge_finished(&enriched, current.clone());
                self.current_match = Some(merged);
                true
            }
            _ => false,
        }
    }
}
