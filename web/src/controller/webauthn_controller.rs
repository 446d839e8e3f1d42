//! Controller for WebAuthn (passkey) ceremonies.
//!
//! Each ceremony is one `POST` route called twice: first with `verify: false` to get
//! options, then with `verify: true`, the attempt id and the authenticator output.

use std::sync::Arc;

use auth_flows::error::{webauthn_error, WebAuthnErrorKind};
use auth_flows::webauthn::{
    AuthenticationCeremony, AuthenticationResponse, AuthenticationResult, RegistrationCeremony,
    RegistrationResponse, RegistrationResult, RegistrationUser,
};
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::Json;
use serde::Deserialize;

use crate::callbacks::WebAuthnCallbacks;
use crate::{AuthEvent, Error};

/// Body of a ceremony request.
#[derive(Debug, Deserialize)]
pub struct WebAuthnRequest<T> {
    #[serde(default)]
    pub verify: bool,
    #[serde(default, alias = "userName")]
    pub user_name: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "attemptId")]
    pub attempt_id: Option<String>,
    pub response: Option<T>,
}

fn missing(field: &str) -> auth_flows::Error {
    webauthn_error(
        WebAuthnErrorKind::Malformed,
        &format!("{} is required", field),
    )
}

fn malformed_body(rejection: JsonRejection) -> auth_flows::Error {
    webauthn_error(
        WebAuthnErrorKind::Malformed,
        &format!("Invalid WebAuthn request: {}", rejection.body_text()),
    )
}

/// Build a `POST` handler for passkey login.
pub fn authenticate_handler<C, S>(ceremony: AuthenticationCeremony, callbacks: C) -> MethodRouter<S>
where
    C: WebAuthnCallbacks<AuthenticationResult>,
    S: Clone + Send + Sync + 'static,
{
    let ceremony = Arc::new(ceremony);
    let callbacks = Arc::new(callbacks);

    post(
        move |event: AuthEvent,
              body: Result<Json<WebAuthnRequest<AuthenticationResponse>>, JsonRejection>| {
            let ceremony = Arc::clone(&ceremony);
            let callbacks = Arc::clone(&callbacks);
            async move { authenticate(&ceremony, callbacks.as_ref(), event, body).await }
        },
    )
}

async fn authenticate<C: WebAuthnCallbacks<AuthenticationResult>>(
    ceremony: &AuthenticationCeremony,
    callbacks: &C,
    event: AuthEvent,
    body: Result<Json<WebAuthnRequest<AuthenticationResponse>>, JsonRejection>,
) -> Result<Response, Error> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return callbacks.on_error(&event, malformed_body(rejection)).await,
    };

    if !body.verify {
        return match ceremony.options(body.user_name.as_deref()).await {
            Ok(options) => Ok(Json(options).into_response()),
            Err(error) => callbacks.on_error(&event, error).await,
        };
    }

    let result = match (body.attempt_id, body.response) {
        (Some(attempt_id), Some(response)) => ceremony.verify(&attempt_id, &response).await,
        (None, _) => Err(missing("attempt_id")),
        (_, None) => Err(missing("response")),
    };

    match result {
        Ok(result) => callbacks.on_success(&event, result).await,
        Err(error) => callbacks.on_error(&event, error).await,
    }
}

/// Build a `POST` handler for passkey creation.
pub fn register_handler<C, S>(ceremony: RegistrationCeremony, callbacks: C) -> MethodRouter<S>
where
    C: WebAuthnCallbacks<RegistrationResult>,
    S: Clone + Send + Sync + 'static,
{
    let ceremony = Arc::new(ceremony);
    let callbacks = Arc::new(callbacks);

    post(
        move |event: AuthEvent,
              body: Result<Json<WebAuthnRequest<RegistrationResponse>>, JsonRejection>| {
            let ceremony = Arc::clone(&ceremony);
            let callbacks = Arc::clone(&callbacks);
            async move { register(&ceremony, callbacks.as_ref(), event, body).await }
        },
    )
}

async fn register<C: WebAuthnCallbacks<RegistrationResult>>(
    ceremony: &RegistrationCeremony,
    callbacks: &C,
    event: AuthEvent,
    body: Result<Json<WebAuthnRequest<RegistrationResponse>>, JsonRejection>,
) -> Result<Response, Error> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return callbacks.on_error(&event, malformed_body(rejection)).await,
    };

    let user_name = match body.user_name {
        Some(user_name) if !user_name.is_empty() => user_name,
        _ => return callbacks.on_error(&event, missing("user_name")).await,
    };

    if !body.verify {
        let user = RegistrationUser {
            user_name,
            display_name: body.display_name,
        };
        return match ceremony.options(&user).await {
            Ok(options) => Ok(Json(options).into_response()),
            Err(error) => callbacks.on_error(&event, error).await,
        };
    }

    let result = match (body.attempt_id, body.response) {
        (Some(attempt_id), Some(response)) => {
            ceremony.verify(&attempt_id, &user_name, &response).await
        }
        (None, _) => Err(missing("attempt_id")),
        (_, None) => Err(missing("response")),
    };

    match result {
        Ok(result) => callbacks.on_success(&event, result).await,
        Err(error) => callbacks.on_error(&event, error).await,
    }
}
