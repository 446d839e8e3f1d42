//! Typed user session stored in the cookie-backed `tower-sessions` session.

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use utoipa::ToSchema;

use crate::Error;

const USER_SESSION_KEY: &str = "auth_utils.user_session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSession {
    /// Whatever the application chose to keep about the user.
    #[schema(value_type = Object)]
    pub user: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub tokens: Option<Value>,
    pub logged_in_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user: Value) -> Self {
        Self {
            user,
            tokens: None,
            logged_in_at: Utc::now(),
        }
    }

    pub fn with_tokens(mut self, tokens: Value) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

/// Replace the logged-in user, rotating the session id.
pub async fn set_user_session(session: &Session, user_session: UserSession) -> Result<(), Error> {
    session.cycle_id().await?;
    session.insert(USER_SESSION_KEY, user_session).await?;
    debug!("User session stored");
    Ok(())
}

pub async fn get_user_session(session: &Session) -> Result<Option<UserSession>, Error> {
    Ok(session.get(USER_SESSION_KEY).await?)
}

/// Log the user out and delete the session.
pub async fn clear_user_session(session: &Session) -> Result<(), Error> {
    session.flush().await?;
    debug!("User session cleared");
    Ok(())
}
