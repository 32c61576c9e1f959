use serde::{Deserialize, Serialize};

use crate::daemon::storage::entities::{Category, Increment};

/// Longest increment the service accepts. A session is flushed every minute, so anything
/// beyond a whole day is a broken client.
pub const MAX_INCREMENT_SECONDS: u64 = 24 * 60 * 60;

/// Body of `POST /api/realtime-update`. `productive` is the tri-state category flag; absent
/// means neutral. Negative `seconds` fail to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeUpdate {
    pub domain: String,
    pub seconds: u64,
    #[serde(default)]
    pub productive: Option<bool>,
}

impl RealtimeUpdate {
    pub fn category(&self) -> Category {
        Category::from_flag(self.productive)
    }
}

impl From<&Increment> for RealtimeUpdate {
    fn from(increment: &Increment) -> Self {
        Self {
            domain: increment.domain.to_string(),
            seconds: increment.seconds,
            productive: increment.category.as_flag(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
