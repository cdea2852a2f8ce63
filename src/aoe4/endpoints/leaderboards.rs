use crate::aoe4::client::Aoe4Client;
use crate::aoe4::profile_id::ProfileId;
use crate::aoe4::types::{LeaderboardEntry, LeaderboardResponse};
use crate::error::AppError;

impl Aoe4Client {
    /// Get the leaderboard rows around a player (e.g. `rm_solo`, `rm_team`)
    pub async fn get_leaderboard(
        &self,
        leaderboard: &str,
        profile_id: &ProfileId,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let response: LeaderboardResponse = self
            .get(
                &format!("/leaderboards/{}", urlencoding::encode(leaderboard)),
                &[("profile_id", profile_id.to_string())],
            )
            .await?;

        Ok(response.leaderboard)
    }
}
