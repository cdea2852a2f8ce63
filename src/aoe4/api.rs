use async_trait::async_trait;

use super::client::Aoe4Client;
use super::profile_id::ProfileId;
use super::types::{Game, Player, PlayerGamesResponse};
use crate::error::AppError;

/// The part of the aoe4world API the poller and the analyzer depend on.
#[async_trait]
pub trait Aoe4Api: Send + Sync {
    async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError>;

    /// Latest game of the player, `None` when the API has nothing to report.
    async fn get_last_game(&self, profile_id: &ProfileId) -> Result<Option<Game>, AppError>;

    async fn get_player_games(
        &self,
        profile_id: &ProfileId,
        page: u32,
        per_page: u32,
    ) -> Result<PlayerGamesResponse, AppError>;
}

#[async_trait]
impl Aoe4Api for Aoe4Client {
    async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError> {
        Aoe4Client::get_player(self, profile_id).await
    }

    async fn get_last_game(&self, profile_id: &ProfileId) -> Result<Option<Game>, AppError> {
        Aoe4Client::get_last_game(self, profile_id).await
    }

    async fn get_player_games(
        &self,
        profile_id: &ProfileId,
        page: u32,
        per_page: u32,
    ) -> Result<PlayerGamesResponse, AppError> {
        Aoe4Client::get_player_games(self, profile_id, page, per_page).await
    }
}
