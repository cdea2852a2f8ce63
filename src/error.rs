use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("AoE4 World API error: {status} - {message}")]
    Aoe4Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid AoE4World URL: {0}")]
    InvalidProfileUrl(String),

    #[error("Stored profile is unreadable: {0}")]
    CorruptedProfile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No profile is tracked")]
    NoTrackedProfile,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // A request that never produced a response is a network failure,
        // anything after that (body, decoding) is unexpected.
        if err.is_connect() || err.is_timeout() || err.is_request() {
            AppError::Network(err)
        } else {
            AppError::Http(err)
        }
    }
}

/// Coarse category of an [`AppError`], used to pick the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    Server,
    Network,
    Validation,
    Unexpected,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Aoe4Api { status: 404, .. } => ErrorKind::NotFound,
            AppError::Aoe4Api { status: 429, .. } => ErrorKind::RateLimited,
            AppError::Aoe4Api { status, .. } if (500..600).contains(status) => ErrorKind::Server,
            AppError::Network(_) => ErrorKind::Network,
            AppError::InvalidProfileUrl(_) | AppError::CorruptedProfile(_) => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Unexpected,
        }
    }

    /// Message suitable for display, never exposing transport internals.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound => "Player not found".into(),
            ErrorKind::RateLimited => "Rate limit exceeded. Please try again later.".into(),
            ErrorKind::Server => "Server error. Please try again later.".into(),
            ErrorKind::Network => "Network error. Please check your connection.".into(),
            ErrorKind::Validation => self.to_string(),
            ErrorKind::Unexpected => match self {
                AppError::Aoe4Api { message, .. } => format!("Error: {message}"),
                _ => "An unexpected error occurred.".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> AppError {
        AppError::Aoe4Api {
            status,
            message: "Bad Request".into(),
        }
    }

    #[test]
    fn statuses_are_categorized() {
        assert_eq!(api(404).kind(), ErrorKind::NotFound);
        assert_eq!(api(429).kind(), ErrorKind::RateLimited);
        assert_eq!(api(500).kind(), ErrorKind::Server);
        assert_eq!(api(503).kind(), ErrorKind::Server);
        assert_eq!(api(400).kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn user_messages() {
        assert_eq!(api(404).user_message(), "Player not found");
        assert_eq!(
            api(502).user_message(),
            "Server error. Please try again later."
        );
        assert_eq!(api(400).user_message(), "Error: Bad Request");
        assert_eq!(
            AppError::NoTrackedProfile.user_message(),
            "An unexpected error occurred."
        );
        assert_eq!(
            AppError::InvalidProfileUrl("https://example.com/foo".into()).kind(),
            ErrorKind::Validation
        );
    }
}
