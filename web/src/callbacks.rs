//! Extension points the host application implements to finish a login.

use async_trait::async_trait;
use auth_flows::oauth::OAuthSuccess;
use axum::response::Response;

use crate::{AuthEvent, Error};

/// Completion hooks for an OAuth route.
#[async_trait]
pub trait OAuthCallbacks: Send + Sync + 'static {
    /// Called once the provider returned tokens and a user profile.
    async fn on_success(&self, event: &AuthEvent, success: OAuthSuccess)
        -> Result<Response, Error>;

    /// Called for every failure of the flow. The default re-raises, which renders the
    /// error as JSON with its status code.
    async fn on_error(
        &self,
        _event: &AuthEvent,
        error: auth_flows::Error,
    ) -> Result<Response, Error> {
        Err(error.into())
    }
}

/// Completion hooks for a WebAuthn route; `R` is the ceremony's verified result.
#[async_trait]
pub trait WebAuthnCallbacks<R: Send + 'static>: Send + Sync + 'static {
    async fn on_success(&self, event: &AuthEvent, result: R) -> Result<Response, Error>;

    async fn on_error(
        &self,
        _event: &AuthEvent,
        error: auth_flows::Error,
    ) -> Result<Response, Error> {
        Err(error.into())
    }
}
