use std::env;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub polling_interval_ms: u64,
    pub database_url: String,
    pub profile_store_key: String,
    pub profile_expiry_days: u32,
    pub api_rate_limit_per_second: NonZeroU32,
    pub request_timeout_secs: u64,
    pub history_games: u32,
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &'static str = "https://aoe4world.com/api/v0";
    pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 10_000;
    pub const DEFAULT_PROFILE_STORE_KEY: &'static str = "aoe4_scout_profile";
    pub const DEFAULT_PROFILE_EXPIRY_DAYS: u32 = 365;

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source. Unparseable numbers fall
    /// back to their default, zero durations and rates are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        const DEFAULT_DATABASE_URL: &str = "sqlite:aoe4-scout.db";
        const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 5;
        const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
        const DEFAULT_HISTORY_GAMES: u32 = 50;

        let api_base_url = lookup("AOE4_API_BASE_URL")
            .unwrap_or_else(|| Self::DEFAULT_API_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let polling_interval_ms = nonzero(
            "POLLING_INTERVAL_MS",
            parse_var(&lookup, "POLLING_INTERVAL_MS")
                .unwrap_or(Self::DEFAULT_POLLING_INTERVAL_MS),
        )?;

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());

        let profile_store_key = lookup("PROFILE_STORE_KEY")
            .unwrap_or_else(|| Self::DEFAULT_PROFILE_STORE_KEY.into());

        let profile_expiry_days: u32 =
            parse_var(&lookup, "PROFILE_EXPIRY_DAYS").unwrap_or(Self::DEFAULT_PROFILE_EXPIRY_DAYS);

        let rate: u32 =
            parse_var(&lookup, "API_RATE_LIMIT_PER_SECOND").unwrap_or(DEFAULT_RATE_LIMIT_PER_SECOND);
        let api_rate_limit_per_second = NonZeroU32::new(rate).ok_or_else(|| {
            AppError::Config("API_RATE_LIMIT_PER_SECOND must be greater than zero".into())
        })?;

        let request_timeout_secs = nonzero(
            "REQUEST_TIMEOUT_SECS",
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )?;

        let history_games: u32 = parse_var(&lookup, "HISTORY_GAMES").unwrap_or(DEFAULT_HISTORY_GAMES);

        Ok(Self {
            api_base_url,
            polling_interval_ms,
            database_url,
            profile_store_key,
            profile_expiry_days,
            api_rate_limit_per_second,
            request_timeout_secs,
            history_games,
        })
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn nonzero(name: &str, value: u64) -> Result<u64, AppError> {
    if value == 0 {
        return Err(AppError::Config(format!("{name} must be greater than zero")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[]).unwrap();

        assert_eq!(config.api_base_url, Config::DEFAULT_API_BASE_URL);
        assert_eq!(config.polling_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.api_rate_limit_per_second.get(), 5);
        assert_eq!(config.profile_expiry_days, 365);
        assert_eq!(config.history_games, 50);
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = config(&[
            ("AOE4_API_BASE_URL", "http://localhost:8080/api/"),
            ("POLLING_INTERVAL_MS", " 2500 "),
            ("HISTORY_GAMES", "not a number"),
        ])
        .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        assert_eq!(config.polling_interval_ms, 2500);
        assert_eq!(config.history_games, 50);
    }

    #[test]
    fn zero_values_are_rejected() {
        for name in [
            "POLLING_INTERVAL_MS",
            "API_RATE_LIMIT_PER_SECOND",
            "REQUEST_TIMEOUT_SECS",
        ] {
            let res = config(&[(name, "0")]);
            assert!(
                matches!(&res, Err(AppError::Config(msg)) if msg.starts_with(name)),
                "{name}=0 should be rejected, got {res:?}"
            );
        }
    }
}
