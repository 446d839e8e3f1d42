//! Controller for OAuth authorization-code logins.
//!
//! One route serves both legs of the flow: without `code` it redirects to the provider,
//! with `code` it finishes the login and hands over to the host's callbacks.

use std::sync::Arc;

use auth_flows::oauth::{CallbackQuery, Flow, FlowOutcome, Provider};
use axum::extract::Query;
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use log::*;

use crate::callbacks::OAuthCallbacks;
use crate::{AuthEvent, Error};

/// Build a `GET` handler driving `flow`, finishing with `callbacks`.
pub fn oauth_handler<P, C, S>(flow: Flow<P>, callbacks: C) -> MethodRouter<S>
where
    P: Provider + 'static,
    C: OAuthCallbacks,
    S: Clone + Send + Sync + 'static,
{
    let flow = Arc::new(flow);
    let callbacks = Arc::new(callbacks);

    get(
        move |event: AuthEvent, Query(query): Query<CallbackQuery>| {
            let flow = Arc::clone(&flow);
            let callbacks = Arc::clone(&callbacks);
            async move { handle(&flow, callbacks.as_ref(), event, query).await }
        },
    )
}

async fn handle<P: Provider, C: OAuthCallbacks>(
    flow: &Flow<P>,
    callbacks: &C,
    event: AuthEvent,
    query: CallbackQuery,
) -> Result<Response, Error> {
    let request_url = event.request_url();

    match flow.handle(query, &request_url).await {
        Ok(FlowOutcome::Redirect(url)) => Ok(found(url.as_str())),
        Ok(FlowOutcome::Authenticated(success)) => callbacks.on_success(&event, *success).await,
        Err(error) => {
            warn!("{} login failed: {}", flow.provider_name(), error.message());
            callbacks.on_error(&event, error).await
        }
    }
}

/// `302 Found` redirect.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use auth_flows::oauth::{providers::okta, OAuthSuccess, ProviderConfig};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    #[derive(Default)]
    struct RecordingCallbacks {
        successes: AtomicUsize,
        errors: AtomicUsize,
    }

    #[async_trait]
    impl OAuthCallbacks for Arc<RecordingCallbacks> {
        async fn on_success(
            &self,
            _event: &AuthEvent,
            success: OAuthSuccess,
        ) -> Result<Response, Error> {
            self.successes.fetch_add(1, Ordering::SeqCst);
            Ok(axum::Json(success.user).into_response())
        }

        async fn on_error(
            &self,
            _event: &AuthEvent,
            error: auth_flows::Error,
        ) -> Result<Response, Error> {
            self.errors.fetch_add(1, Ordering::SeqCst);
            Err(error.into())
        }
    }

    /// Only the required success hook; errors use the default.
    struct SuccessOnly;

    #[async_trait]
    impl OAuthCallbacks for SuccessOnly {
        async fn on_success(
            &self,
            _event: &AuthEvent,
            _success: OAuthSuccess,
        ) -> Result<Response, Error> {
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }

    async fn okta_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_body(
                json!({
                    "authorization_endpoint": format!("{}/authorize", base),
                    "token_endpoint": format!("{}/token", base),
                    "userinfo_endpoint": format!("{}/userinfo", base),
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
    }

    fn okta_flow(domain: Option<String>) -> Flow<okta::Provider> {
        Flow::new(
            okta::Provider,
            ProviderConfig {
                client_id: Some("a".to_string()),
                client_secret: Some("b".to_string().into()),
                domain,
                email_required: Some(true),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", "localhost:4000")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_initial_request_redirects_to_provider() {
        let server = okta_server().await;
        let app: Router = Router::new().route(
            "/auth/okta",
            oauth_handler(okta_flow(Some(server.url())), SuccessOnly),
        );

        let response = app.oneshot(get_request("/auth/okta")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{}/authorize?", server.url())));
        assert!(location.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4000%2Fauth%2Fokta"));
        assert!(location.contains("scope=openid+offline_access+email"));
    }

    #[tokio::test]
    async fn test_successful_callback_runs_on_success_once() {
        let mut server = okta_server().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({"access_token": "at", "token_type": "Bearer"}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(json!({"sub": "00u1", "email": "jane@example.com"}).to_string())
            .create_async()
            .await;
        let callbacks = Arc::new(RecordingCallbacks::default());
        let app: Router = Router::new().route(
            "/auth/okta",
            oauth_handler(okta_flow(Some(server.url())), callbacks.clone()),
        );

        let response = app
            .oneshot(get_request("/auth/okta?code=abc&state=s1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "jane@example.com");
        assert_eq!(callbacks.successes.load(Ordering::SeqCst), 1);
        assert_eq!(callbacks.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_error_runs_on_error_once() {
        let mut server = okta_server().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(json!({"error": "invalid_grant"}).to_string())
            .create_async()
            .await;
        let callbacks = Arc::new(RecordingCallbacks::default());
        let app: Router = Router::new().route(
            "/auth/okta",
            oauth_handler(okta_flow(Some(server.url())), callbacks.clone()),
        );

        let response = app
            .oneshot(get_request("/auth/okta?code=abc"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["provider"], "okta");
        assert_eq!(body["data"]["error"], "invalid_grant");
        assert_eq!(callbacks.successes.load(Ordering::SeqCst), 0);
        assert_eq!(callbacks.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_configuration_without_on_error() {
        let app: Router =
            Router::new().route("/auth/okta", oauth_handler(okta_flow(None), SuccessOnly));

        let response = app.oneshot(get_request("/auth/okta")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["message"], "Missing okta OAuth configuration: domain");
    }
}
