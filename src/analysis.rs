//! Teammate frequency and results over a player's game history.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::aoe4::{Game, ProfileId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeammateStats {
    pub profile_id: ProfileId,
    pub name: String,
    pub games_together: u32,
    pub wins: u32,
    pub losses: u32,
}

impl TeammateStats {
    /// Percentage of shared games won, from 0 to 100.
    pub fn win_rate(&self) -> f64 {
        if self.games_together == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.games_together) * 100.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamAnalysis {
    pub total_games_analyzed: u32,
    pub games_with_teammates: u32,
    pub unique_teammates: u32,
    /// Most frequent teammates first, ties in first-seen order.
    pub teammates: Vec<TeammateStats>,
}

impl TeamAnalysis {
    /// Teammates with at least `min_games` shared games, at most `limit` of them.
    pub fn frequent(&self, min_games: u32, limit: usize) -> impl Iterator<Item = &TeammateStats> {
        self.teammates
            .iter()
            .filter(move |t| t.games_together >= min_games)
            .take(limit)
    }
}

pub fn analyze_team_patterns(games: &[Game], profile_id: &ProfileId) -> TeamAnalysis {
    let mut teammates: Vec<TeammateStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut total_games_analyzed = 0;
    let mut games_with_teammates = 0;

    for game in games {
        // Only games without any team data are left out; an empty roster
        // still counts as analyzed.
        if game.teams.is_none() {
            continue;
        }
        total_games_analyzed += 1;

        let Some(team) = game.team_of(profile_id) else {
            continue;
        };
        if team.players.len() <= 1 {
            continue;
        }
        games_with_teammates += 1;

        for mate in &team.players {
            let Some(mate_id) = mate.profile_id.as_ref() else {
                continue;
            };
            if mate_id.same_as(profile_id) {
                continue;
            }

            let slot = *index.entry(mate_id.to_string()).or_insert_with(|| {
                teammates.push(TeammateStats {
                    profile_id: mate_id.clone(),
                    name: mate.display_name().to_string(),
                    games_together: 0,
                    wins: 0,
                    losses: 0,
                });
                teammates.len() - 1
            });

            let stats = &mut teammates[slot];
            stats.games_together += 1;
            if mate.is_win() {
                stats.wins += 1;
            } else {
                stats.losses += 1;
            }
        }
    }

    // Stable: equal counts keep first-seen order.
    teammates.sort_by(|a, b| b.games_together.cmp(&a.games_together));

    debug!(
        total_games_analyzed,
        games_with_teammates,
        unique_teammates = teammates.len(),
        "👥 Team patterns analyzed"
    );

    TeamAnalysis {
        total_games_analyzed,
        games_with_teammates,
        unique_teammates: teammates.len() as u32,
        teammates,
    }
}
