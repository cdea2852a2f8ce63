use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::profile_id::ProfileId;

// ============================================================================
// Players
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub rank: Option<u32>,
    pub rank_level: Option<String>,
    pub streak: Option<i32>,
    pub games_count: Option<u32>,
    pub wins_count: Option<u32>,
    pub losses_count: Option<u32>,
    pub win_rate: Option<f64>,
    pub last_game_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modes {
    pub rm_solo: Option<Mode>,
    pub rm_team: Option<Mode>,
    pub rm_1v1_elo: Option<Mode>,
    pub rm_2v2_elo: Option<Mode>,
    pub rm_3v3_elo: Option<Mode>,
    pub rm_4v4_elo: Option<Mode>,
    pub qm_1v1: Option<Mode>,
    pub qm_2v2: Option<Mode>,
    pub qm_3v3: Option<Mode>,
    pub qm_4v4: Option<Mode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Social {
    pub twitch: Option<String>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Avatars {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub profile_id: u64,
    pub name: String,
    pub rating: Option<i32>,
    pub rank: Option<u32>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub win_rate: Option<f64>,
    pub games_count: Option<u32>,
    pub last_game_at: Option<DateTime<Utc>>,
    pub country: Option<String>,
    pub social: Option<Social>,
    pub avatars: Option<Avatars>,
    pub modes: Option<Modes>,
}

impl Player {
    /// Solo ranked summary, falling back to the legacy 1v1 elo leaderboard.
    pub fn solo_mode(&self) -> Option<&Mode> {
        let modes = self.modes.as_ref()?;
        modes.rm_solo.as_ref().or(modes.rm_1v1_elo.as_ref())
    }

    pub fn team_mode(&self) -> Option<&Mode> {
        self.modes.as_ref()?.rm_team.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub players: Vec<Player>,
}

// ============================================================================
// Leaderboards
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub rating: i32,
    pub profile_id: u64,
    pub name: String,
    pub games_count: Option<u32>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub win_rate: Option<f64>,
    pub last_game_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

// ============================================================================
// Games
// ============================================================================

/// Game identifier. The API serves it as a number, older payloads as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => GameId(n.to_string()),
            Raw::Text(s) => GameId(s),
        })
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        GameId(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPlayer {
    pub profile_id: Option<ProfileId>,
    #[serde(default)]
    pub name: Option<String>,
    pub rating: Option<i32>,
    pub rating_diff: Option<i32>,
    pub civilization: Option<String>,
    pub color: Option<u32>,
    pub team: Option<u32>,
    /// Per-player outcome, `"win"` or `"loss"` once the game is decided.
    pub result: Option<String>,
    /// Full profile, filled in by enrichment when the snapshot lacks it.
    pub player: Option<Player>,
}

impl TeamPlayer {
    pub fn is_win(&self) -> bool {
        self.result.as_deref() == Some("win")
    }

    pub fn is(&self, profile_id: &ProfileId) -> bool {
        self.profile_id.as_ref().is_some_and(|id| id.same_as(profile_id))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// One side of a game. Accepts both the bare-array and the object forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TeamRepr")]
pub struct Team {
    pub winner: Option<bool>,
    pub players: Vec<TeamPlayer>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TeamRepr {
    Roster(Vec<TeamPlayer>),
    Object {
        #[serde(default)]
        winner: Option<bool>,
        #[serde(default)]
        players: Vec<TeamPlayer>,
    },
}

impl From<TeamRepr> for Team {
    fn from(repr: TeamRepr) -> Self {
        match repr {
            TeamRepr::Roster(players) => Team {
                winner: None,
                players,
            },
            TeamRepr::Object { winner, players } => Team { winner, players },
        }
    }
}

impl Team {
    pub fn contains(&self, profile_id: &ProfileId) -> bool {
        self.players.iter().any(|p| p.is(profile_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Seconds.
    pub duration: Option<u64>,
    pub map: Option<String>,
    pub kind: Option<String>,
    pub leaderboard: Option<String>,
    pub season: Option<u32>,
    pub server: Option<String>,
    pub patch: Option<u32>,
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ongoing: bool,
    #[serde(default)]
    pub just_finished: bool,
    /// `None` when the payload carries no team data at all.
    #[serde(default)]
    pub teams: Option<Vec<Team>>,
}

impl Game {
    pub fn teams(&self) -> &[Team] {
        self.teams.as_deref().unwrap_or_default()
    }

    pub fn teams_mut(&mut self) -> &mut [Team] {
        self.teams.as_deref_mut().unwrap_or_default()
    }

    pub fn players(&self) -> impl Iterator<Item = &TeamPlayer> {
        self.teams().iter().flat_map(|t| t.players.iter())
    }

    pub fn team_of(&self, profile_id: &ProfileId) -> Option<&Team> {
        self.teams().iter().find(|t| t.contains(profile_id))
    }

    /// Everyone on the player's team except the player. Empty when the
    /// player is not in the roster.
    pub fn teammates_of(&self, profile_id: &ProfileId) -> Vec<&TeamPlayer> {
        self.team_of(profile_id)
            .map(|team| team.players.iter().filter(|p| !p.is(profile_id)).collect())
            .unwrap_or_default()
    }

    /// Everyone on the other teams. Empty when the player is not in the roster.
    pub fn opponents_of(&self, profile_id: &ProfileId) -> Vec<&TeamPlayer> {
        if self.team_of(profile_id).is_none() {
            return Vec::new();
        }
        self.teams()
            .iter()
            .filter(|t| !t.contains(profile_id))
            .flat_map(|t| t.players.iter())
            .collect()
    }

    /// Whether the player's team won: the team `winner` flag, else the
    /// player's own `result`. `None` while undecided or when absent.
    pub fn won_by(&self, profile_id: &ProfileId) -> Option<bool> {
        let team = self.team_of(profile_id)?;
        if let Some(winner) = team.winner {
            return Some(winner);
        }
        team.players
            .iter()
            .find(|p| p.is(profile_id))
            .and_then(|p| p.result.as_deref())
            .map(|result| result == "win")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerGamesResponse {
    #[serde(default)]
    pub games: Vec<Game>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn game_id_accepts_numbers_and_strings() {
        let numeric: Game = serde_json::from_value(json!({"game_id": 123456, "teams": []})).unwrap();
        let text: Game = serde_json::from_value(json!({"game_id": "abc"})).unwrap();

        assert_eq!(numeric.game_id, GameId("123456".into()));
        assert_eq!(text.game_id, GameId("abc".into()));
        assert!(!text.ongoing);
        assert_eq!(numeric.teams, Some(vec![]));
        assert_eq!(text.teams, None);
        assert!(text.teams().is_empty());
    }

    #[test]
    fn team_accepts_both_shapes() {
        let game: Game = serde_json::from_value(json!({
            "game_id": 1,
            "ongoing": true,
            "teams": [
                [{"profile_id": 1, "name": "A", "result": "win"}],
                {"winner": false, "players": [{"profile_id": 2, "name": "B"}]}
            ]
        }))
        .unwrap();

        assert_eq!(game.teams().len(), 2);
        assert_eq!(game.teams()[0].players[0].display_name(), "A");
        assert!(game.teams()[0].players[0].is_win());
        assert_eq!(game.teams()[1].winner, Some(false));
        assert!(game.team_of(&ProfileId::Numeric(2)).is_some());
        assert!(game.team_of(&ProfileId::Numeric(3)).is_none());
    }

    fn team_game() -> Game {
        serde_json::from_value(json!({
            "game_id": 1,
            "teams": [
                {"winner": true, "players": [
                    {"profile_id": 1, "name": "me"},
                    {"profile_id": 2, "name": "mate"}
                ]},
                {"winner": false, "players": [
                    {"profile_id": 3, "name": "foe"},
                    {"profile_id": 4, "name": "other foe"}
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn splits_roster_around_player() {
        let game = team_game();
        let me = ProfileId::Numeric(1);

        let mates: Vec<_> = game.teammates_of(&me).into_iter().map(|p| p.display_name()).collect();
        let foes: Vec<_> = game.opponents_of(&me).into_iter().map(|p| p.display_name()).collect();

        assert_eq!(mates, ["mate"]);
        assert_eq!(foes, ["foe", "other foe"]);
        assert!(game.teammates_of(&ProfileId::Numeric(9)).is_empty());
        assert!(game.opponents_of(&ProfileId::Numeric(9)).is_empty());
    }

    #[test]
    fn result_follows_team_flag_then_own_result() {
        let game = team_game();
        assert_eq!(game.won_by(&ProfileId::Numeric(2)), Some(true));
        assert_eq!(game.won_by(&ProfileId::Numeric(4)), Some(false));
        assert_eq!(game.won_by(&ProfileId::Numeric(9)), None);

        let roster: Game = serde_json::from_value(json!({
            "game_id": 2,
            "teams": [
                [{"profile_id": 1, "result": "loss"}],
                [{"profile_id": 2}]
            ]
        }))
        .unwrap();
        assert_eq!(roster.won_by(&ProfileId::Numeric(1)), Some(false));
        assert_eq!(roster.won_by(&ProfileId::Numeric(2)), None);
    }

    #[test]
    fn solo_mode_falls_back_to_elo() {
        let player = Player {
            modes: Some(Modes {
                rm_1v1_elo: Some(Mode {
                    rating: Some(1200),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(player.solo_mode().and_then(|m| m.rating), Some(1200));
        assert!(player.team_mode().is_none());
    }
}
