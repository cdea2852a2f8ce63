use crate::aoe4::client::Aoe4Client;
use crate::aoe4::profile_id::ProfileId;
use crate::aoe4::types::{Game, GameId, PlayerGamesResponse};
use crate::error::{AppError, ErrorKind};

impl Aoe4Client {
    /// Get the most recent game of a player, ongoing or finished.
    /// A 404 or an empty body means the player has no game to show.
    pub async fn get_last_game(&self, profile_id: &ProfileId) -> Result<Option<Game>, AppError> {
        match self
            .get_optional(&format!("/players/{profile_id}/games/last"), &[])
            .await
        {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            other => other,
        }
    }

    /// Get one page of the player's game history, most recent first
    pub async fn get_player_games(
        &self,
        profile_id: &ProfileId,
        page: u32,
        per_page: u32,
    ) -> Result<PlayerGamesResponse, AppError> {
        self.get(
            &format!("/players/{profile_id}/games"),
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    /// Get a single game by id
    pub async fn get_game(&self, game_id: &GameId) -> Result<Game, AppError> {
        self.get(
            &format!("/games/{}", urlencoding::encode(&game_id.0)),
            &[],
        )
        .await
    }
}
