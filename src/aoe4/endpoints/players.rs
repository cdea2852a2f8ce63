use crate::aoe4::client::Aoe4Client;
use crate::aoe4::profile_id::ProfileId;
use crate::aoe4::types::{Player, SearchResponse};
use crate::error::AppError;

impl Aoe4Client {
    /// Get the full profile of a player
    pub async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError> {
        self.get(&format!("/players/{profile_id}"), &[]).await
    }

    /// Search players by name
    pub async fn search_players(&self, query: &str) -> Result<Vec<Player>, AppError> {
        let response: Option<SearchResponse> = self
            .get_optional("/players/search", &[("query", query.to_string())])
            .await?;

        Ok(response.map(|r| r.players).unwrap_or_default())
    }
}
