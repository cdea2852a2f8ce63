use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier of an aoe4world profile.
///
/// Most profiles use a numeric id; 17-digit Steam ids are kept as text so
/// they survive unchanged through URLs and persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileId {
    Numeric(u64),
    Steam(String),
}

const STEAM_ID_LEN: usize = 17;

impl ProfileId {
    /// Extract the profile id from a URL such as
    /// `https://aoe4world.com/players/12345-SomeName`.
    ///
    /// The first `players/<digits>` segment wins. Digits followed by a
    /// `-<slug>` keep only the numeric part, exactly 17 digits stay a Steam id.
    pub fn from_url(url: &str) -> Result<Self, AppError> {
        for (idx, marker) in url.match_indices("players/") {
            let rest = &url[idx + marker.len()..];
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len == 0 {
                continue;
            }

            let digits = &rest[..digits_len];
            let has_slug = rest[digits_len..]
                .strip_prefix('-')
                .and_then(|slug| slug.chars().next())
                .is_some_and(|c| !matches!(c, '/' | '?' | '#') && !c.is_whitespace());

            if !has_slug && digits_len == STEAM_ID_LEN {
                return Ok(ProfileId::Steam(digits.to_string()));
            }

            return digits
                .parse()
                .map(ProfileId::Numeric)
                .map_err(|_| AppError::InvalidProfileUrl(url.to_string()));
        }

        Err(AppError::InvalidProfileUrl(url.to_string()))
    }

    /// Textual comparison, so a numeric id matches the same id sent as a string.
    pub fn same_as(&self, other: &ProfileId) -> bool {
        match (self, other) {
            (ProfileId::Numeric(a), ProfileId::Numeric(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileId::Numeric(id) => write!(f, "{id}"),
            ProfileId::Steam(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ProfileId {
    fn from(value: u64) -> Self {
        ProfileId::Numeric(value)
    }
}
