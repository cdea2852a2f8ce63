//! Latest-game polling: pure reconciliation, roster enrichment and the
//! periodic task tying them together.

pub mod enrich;
pub mod reconcile;
mod task;

pub use enrich::{EnrichedGame, EnrichmentOutcome, enrich_game};
pub use reconcile::{MatchEvent, ReconcilerState, reconcile};
pub use task::{GamePoller, PollTarget, PollerEvent, PollerHandle, PollerView};
