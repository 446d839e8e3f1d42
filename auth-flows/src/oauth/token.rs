//! Token endpoint response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from a provider's token endpoint.
///
/// Successful and error responses share this shape; `error` is set on failure.
/// Fields this type doesn't name are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Value for the `Authorization` header of user-info requests.
    pub fn authorization_header(&self) -> String {
        format!(
            "{} {}",
            self.token_type.as_deref().unwrap_or("Bearer"),
            self.access_token.as_deref().unwrap_or_default()
        )
    }

    /// Human-readable reason for an error response.
    pub fn error_reason(&self) -> &str {
        self.error_description
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("Unknown error")
    }
}
