//! Demo server: Okta and Google logins plus passkeys, kept in a cookie session.

use std::sync::Arc;

use async_trait::async_trait;
use auth_flows::oauth::providers::{google, okta};
use auth_flows::oauth::{Flow, OAuthSuccess, ProviderConfig};
use auth_flows::webauthn::{
    AuthenticationCeremony, AuthenticationResult, MemoryChallengeStore, MemoryCredentialStore,
    RegistrationCeremony, RegistrationResult,
};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use log::*;
use serde_json::{json, Value};
use service::{config::Config, logging::Logger};
use web::session::{set_user_session, UserSession};
use web::{provider_config, AuthEvent, OAuthCallbacks, WebAuthnCallbacks};

/// Logs the user in by storing their profile in the session.
struct PlaygroundCallbacks {
    credentials: Arc<MemoryCredentialStore>,
}

/// Only same-origin paths are followed after login; anything else goes to `/`.
fn local_path(return_to: Option<&str>) -> &str {
    match return_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[async_trait]
impl OAuthCallbacks for PlaygroundCallbacks {
    async fn on_success(
        &self,
        event: &AuthEvent,
        success: OAuthSuccess,
    ) -> Result<Response, web::Error> {
        let return_to = local_path(success.user.return_to()).to_string();
        let user = Value::Object(success.user.claims().clone());
        let tokens = serde_json::to_value(&success.tokens).unwrap_or_default();

        set_user_session(event.session()?, UserSession::new(user).with_tokens(tokens)).await?;
        Ok((
            axum::http::StatusCode::FOUND,
            [(axum::http::header::LOCATION, return_to)],
        )
            .into_response())
    }
}

#[async_trait]
impl WebAuthnCallbacks<AuthenticationResult> for PlaygroundCallbacks {
    async fn on_success(
        &self,
        event: &AuthEvent,
        result: AuthenticationResult,
    ) -> Result<Response, web::Error> {
        self.credentials.update(&result.credential);
        let user = json!({ "userName": result.credential.user_name });

        set_user_session(event.session()?, UserSession::new(user.clone())).await?;
        Ok(Json(user).into_response())
    }
}

#[async_trait]
impl WebAuthnCallbacks<RegistrationResult> for PlaygroundCallbacks {
    async fn on_success(
        &self,
        event: &AuthEvent,
        result: RegistrationResult,
    ) -> Result<Response, web::Error> {
        let user = json!({ "userName": result.credential.user_name });
        self.credentials.save(result.credential);

        set_user_session(event.session()?, UserSession::new(user.clone())).await?;
        Ok(Json(user).into_response())
    }
}

fn auth_routes(config: &Config) -> Result<Router, auth_flows::Error> {
    let credentials = Arc::new(MemoryCredentialStore::new());
    let challenges = Arc::new(MemoryChallengeStore::new());
    let rp = provider_config::relying_party(config);
    let callbacks = || PlaygroundCallbacks {
        credentials: Arc::clone(&credentials),
    };

    // Settings passed in code win over the environment
    let okta_flow = Flow::new(
        okta::Provider,
        ProviderConfig {
            email_required: Some(true),
            ..Default::default()
        }
        .merge(provider_config::okta(config)),
    )?;
    let google_flow = Flow::new(google::Provider, provider_config::google(config))?;

    Ok(Router::new()
        .route("/auth/okta", web::oauth_handler(okta_flow, callbacks()))
        .route("/auth/google", web::oauth_handler(google_flow, callbacks()))
        .route(
            "/auth/webauthn/authenticate",
            web::authenticate_handler(
                AuthenticationCeremony::new(rp.clone(), challenges.clone(), credentials.clone()),
                callbacks(),
            ),
        )
        .route(
            "/auth/webauthn/register",
            web::register_handler(
                RegistrationCeremony::new(rp, challenges.clone(), credentials.clone()),
                callbacks(),
            ),
        ))
}

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting auth_utils_rs demo server...");

    let routes = match auth_routes(&config) {
        Ok(routes) => routes,
        Err(e) => {
            error!("Failed to build auth routes: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(config, routes).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_keeps_relative_paths() {
        assert_eq!(local_path(Some("/dashboard?tab=keys")), "/dashboard?tab=keys");
        assert_eq!(local_path(None), "/");
    }

    #[test]
    fn test_local_path_rejects_other_origins() {
        assert_eq!(local_path(Some("https://evil.example")), "/");
        assert_eq!(local_path(Some("//evil.example")), "/");
        assert_eq!(local_path(Some("/\\evil.example")), "/");
        assert_eq!(local_path(Some("dashboard")), "/");
    }
}
