use std::fmt::Debug;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::trace;

use super::metrics::RequestMetrics;
use crate::config::Config;
use crate::error::AppError;

/// HTTP client for the public aoe4world REST API.
pub struct Aoe4Client {
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    base_url: String,
    metrics: Arc<RequestMetrics>,
}

impl std::fmt::Debug for Aoe4Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aoe4Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Aoe4Client {
    pub fn new(
        base_url: impl Into<String>,
        rate_limit_per_second: NonZeroU32,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("aoe4-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::Http)?;

        Ok(Self {
            client,
            limiter: RateLimiter::direct(Quota::per_second(rate_limit_per_second)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metrics: RequestMetrics::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_rate_limit_per_second,
            config.request_timeout(),
        )
    }

    pub fn metrics(&self) -> Arc<RequestMetrics> {
        self.metrics.clone()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` relative to the base URL and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned + Debug>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        self.get_optional(path, query)
            .await?
            .ok_or_else(|| AppError::Aoe4Api {
                status: StatusCode::NO_CONTENT.as_u16(),
                message: "empty response body".into(),
            })
    }

    /// Same as [`Self::get`] but maps an empty or `null` body to `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned + Debug>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AppError> {
        // Wait for a slot before hitting the API
        self.limiter.until_ready().await;
        self.metrics.inc();

        let url = self.url(path);
        trace!(%url, "🛰️ GET");

        let res = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .inspect_err(|_| self.metrics.inc_failure())?;

        let status = res.status();
        if !status.is_success() {
            self.metrics.inc_failure();
            return Err(AppError::Aoe4Api {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string(),
            });
        }

        let body = res.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
