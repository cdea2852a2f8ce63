//! The tracked profile, persisted in a single key-value slot.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::aoe4::{Aoe4Api, Player, ProfileId};
use crate::db::Repository;
use crate::error::AppError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProfile {
    pub profile_id: ProfileId,
    pub profile_url: String,
    pub player: Player,
}

#[derive(Debug, Clone)]
pub struct ProfileStore {
    repo: Repository,
    key: String,
    expiry_days: u32,
}

impl ProfileStore {
    pub fn new(repo: Repository, key: impl Into<String>, expiry_days: u32) -> Self {
        Self {
            repo,
            key: key.into(),
            expiry_days,
        }
    }

    /// Load the tracked profile. Missing, expired and unreadable entries all
    /// read as "nothing tracked"; unreadable ones are discarded.
    pub async fn load(&self) -> Result<Option<TrackedProfile>, AppError> {
        let Some(raw) = self.repo.get(&self.key, now()).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<TrackedProfile>(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                let err = AppError::CorruptedProfile(e.to_string());
                warn!(error = %err, key = %self.key, "🗄️ ⚠️ Discarding saved profile");
                self.repo.delete(&self.key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, profile: &TrackedProfile) -> Result<(), AppError> {
        let value = serde_json::to_string(profile)?;
        let expires_at = now() + i64::from(self.expiry_days) * SECONDS_PER_DAY;
        self.repo.put(&self.key, &value, expires_at).await
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        self.repo.delete(&self.key).await?;
        Ok(())
    }

    /// Parse `url`, confirm the player exists and persist it.
    ///
    /// The stored id is the canonical one returned by the API, which may
    /// differ from the id in the URL. Nothing is written on failure.
    #[instrument(skip(self, api))]
    pub async fn track_url<A: Aoe4Api + ?Sized>(
        &self,
        api: &A,
        url: &str,
    ) -> Result<TrackedProfile, AppError> {
        let initial_id = ProfileId::from_url(url)?;
        let player = api.get_player(&initial_id).await?;

        let profile = TrackedProfile {
            profile_id: ProfileId::Numeric(player.profile_id),
            profile_url: url.to_string(),
            player,
        };
        self.save(&profile).await?;

        info!(
            profile_id = %profile.profile_id,
            name = %profile.player.name,
            "🗄️ ✅ Profile saved"
        );
        Ok(profile)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoe4::{Game, PlayerGamesResponse};
    use crate::db::Database;
    use async_trait::async_trait;

    struct OnePlayer;

    #[async_trait]
    impl Aoe4Api for OnePlayer {
        async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError> {
            match profile_id {
                ProfileId::Numeric(12345) | ProfileId::Steam(_) => Ok(Player {
                    profile_id: 12345,
                    name: "Beasty".into(),
                    ..Default::default()
                }),
                _ => Err(AppError::Aoe4Api {
                    status: 404,
                    message: "Not Found".into(),
                }),
            }
        }

        async fn get_last_game(&self, _: &ProfileId) -> Result<Option<Game>, AppError> {
            Ok(None)
        }

        async fn get_player_games(
            &self,
            _: &ProfileId,
            _: u32,
            _: u32,
        ) -> Result<PlayerGamesResponse, AppError> {
            unimplemented!()
        }
    }

    async fn store() -> ProfileStore {
        let db = Database::in_memory().await.unwrap();
        ProfileStore::new(db.repository(), "aoe4_scout_profile", 365)
    }

    #[tokio::test]
    async fn track_uses_canonical_id() {
        let store = store().await;
        let url = "https://aoe4world.com/players/76561198000000000";

        let profile = store.track_url(&OnePlayer, url).await.unwrap();

        assert_eq!(profile.profile_id, ProfileId::Numeric(12345));
        assert_eq!(store.load().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn malformed_url_keeps_existing_profile() {
        let store = store().await;
        let saved = store
            .track_url(&OnePlayer, "https://aoe4world.com/players/12345-beasty")
            .await
            .unwrap();

        let res = store.track_url(&OnePlayer, "https://example.com/foo").await;

        assert!(matches!(res, Err(AppError::InvalidProfileUrl(_))));
        assert_eq!(store.load().await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn unknown_player_is_not_saved() {
        let store = store().await;

        let res = store
            .track_url(&OnePlayer, "https://aoe4world.com/players/999")
            .await;

        assert!(res.is_err());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_entry_is_discarded() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.repository();
        repo.put("aoe4_scout_profile", "{not json", i64::MAX)
            .await
            .unwrap();
        let store = ProfileStore::new(repo.clone(), "aoe4_scout_profile", 365);

        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(repo.get("aoe4_scout_profile", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_shape_is_camel_case() {
        let store = store().await;
        let profile = store
            .track_url(&OnePlayer, "https://aoe4world.com/players/12345")
            .await
            .unwrap();

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["profileId"], 12345);
        assert_eq!(json["profileUrl"], "https://aoe4world.com/players/12345");
        assert_eq!(json["player"]["name"], "Beasty");
    }

    #[tokio::test]
    async fn saved_profile_expires_after_configured_days() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.repository();
        let store = ProfileStore::new(repo.clone(), "aoe4_scout_profile", 2);
        store
            .track_url(&OnePlayer, "https://aoe4world.com/players/12345")
            .await
            .unwrap();

        let now = chrono::Utc::now().timestamp();
        let day = SECONDS_PER_DAY;
        assert!(repo.get("aoe4_scout_profile", now + day).await.unwrap().is_some());
        assert!(repo.get("aoe4_scout_profile", now + 3 * day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_forgets_profile() {
        let store = store().await;
        store
            .track_url(&OnePlayer, "https://aoe4world.com/players/12345")
            .await
            .unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
    }
}
