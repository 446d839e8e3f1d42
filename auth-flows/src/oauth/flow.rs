//! Generic OAuth 2.0 authorization-code flow.
//!
//! Each incoming request makes exactly one transition:
//! - no `code`: a fresh state is issued and the user is redirected to the provider
//! - `code` present: the code is exchanged for tokens and the user profile is fetched
//!
//! Cross-request continuity is carried only by the `state` parameter and the
//! [`StateStore`].

use std::sync::Arc;

use log::*;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use url::Url;

use super::discovery::{self, DiscoveryDocument};
use super::state::{MemoryStateStore, StateStore};
use super::{EndpointSource, Endpoints, Provider, ProviderConfig, TokenResponse};
use crate::error::{
    http_error, missing_config_error, oauth_error, Error, HttpErrorKind, OAuthErrorKind,
};
use crate::http::HttpClientBuilder;

/// How callbacks carrying an unknown `state` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatePolicy {
    /// Unknown states are logged and the exchange still runs.
    #[default]
    Lenient,
    /// Unknown or expired states are rejected before the exchange.
    Strict,
}

/// Query parameters an OAuth route receives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub return_to: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Identity claims returned by the provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    const RETURN_TO: &'static str = "return_to";

    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Where the user asked to go once logged in.
    pub fn return_to(&self) -> Option<&str> {
        self.0.get(Self::RETURN_TO).and_then(Value::as_str)
    }

    fn set_return_to(&mut self, return_to: Option<String>) {
        if let Some(return_to) = return_to {
            self.0
                .insert(Self::RETURN_TO.to_string(), Value::String(return_to));
        }
    }
}

/// Tokens and profile handed to the host's success callback.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthSuccess {
    pub tokens: TokenResponse,
    pub user: UserProfile,
}

/// Result of one request through the flow.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Send the browser to the provider's authorization endpoint.
    Redirect(Url),
    /// The user logged in.
    Authenticated(Box<OAuthSuccess>),
}

/// Authorization-code flow for one provider.
pub struct Flow<P: Provider> {
    provider: P,
    config: ProviderConfig,
    client: reqwest::Client,
    discovery: OnceCell<DiscoveryDocument>,
    states: Arc<dyn StateStore>,
    state_policy: StatePolicy,
}

impl<P: Provider> Flow<P> {
    /// Create a flow for `provider`, merging `config` over the provider defaults.
    ///
    /// Missing required fields are not an error here; they are reported per request so
    /// the host's error callback sees them.
    pub fn new(provider: P, config: ProviderConfig) -> Result<Self, Error> {
        let config = config.merge(provider.defaults());
        let client = HttpClientBuilder::new().build()?;

        Ok(Self {
            provider,
            config,
            client,
            discovery: OnceCell::new(),
            states: Arc::new(MemoryStateStore::new()),
            state_policy: StatePolicy::default(),
        })
    }

    /// Use a different pending-state store.
    pub fn with_state_store(mut self, states: Arc<dyn StateStore>) -> Self {
        self.states = states;
        self
    }

    /// Change how unknown callback states are treated.
    pub fn with_state_policy(mut self, state_policy: StatePolicy) -> Self {
        self.state_policy = state_policy;
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.kind().as_str()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Drive one request through the flow.
    ///
    /// `request_url` is the URL of the route handling this flow, used as `redirect_uri`
    /// unless the configuration overrides it.
    pub async fn handle(
        &self,
        query: CallbackQuery,
        request_url: &str,
    ) -> Result<FlowOutcome, Error> {
        self.run(query, request_url)
            .await
            .map_err(|e| e.with_provider(self.provider_name()))
    }

    async fn run(&self, query: CallbackQuery, request_url: &str) -> Result<FlowOutcome, Error> {
        self.check_configuration()?;
        let redirect_url = self
            .config
            .redirect_url
            .clone()
            .unwrap_or_else(|| request_url.to_string());

        let code = match query.code.as_deref() {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                if let Some(error) = query.error {
                    let reason = query.error_description.unwrap_or_else(|| error.clone());
                    warn!("{} authorization was denied: {}", self.provider_name(), reason);
                    return Err(oauth_error(
                        OAuthErrorKind::AccessDenied,
                        &format!("{} login failed: {}", self.provider_name(), reason),
                    )
                    .with_data(serde_json::json!({ "error": error })));
                }
                let endpoints = self.endpoints().await?;
                let url = self
                    .authorization_url(&endpoints, &redirect_url, query.return_to)
                    .await?;
                return Ok(FlowOutcome::Redirect(url));
            }
        };

        // The state is consumed before the exchange so it is gone whatever the outcome.
        let pending = match query.state.as_deref() {
            Some(state) => self.states.take(state).await?,
            None => None,
        };
        if pending.is_none() {
            match self.state_policy {
                StatePolicy::Strict => {
                    return Err(oauth_error(
                        OAuthErrorKind::InvalidState,
                        "Unknown or expired OAuth state",
                    ))
                }
                StatePolicy::Lenient => debug!(
                    "{} callback state was not issued by this flow, continuing",
                    self.provider_name()
                ),
            }
        }

        let endpoints = self.endpoints().await?;
        let tokens = self
            .exchange_code(&endpoints, &code, query.state.as_deref(), &redirect_url)
            .await?;
        let mut user = self.fetch_user(&endpoints, &tokens).await?;
        user.set_return_to(pending.and_then(|p| p.return_to).or(query.return_to));

        info!("{} login succeeded", self.provider_name());
        Ok(FlowOutcome::Authenticated(Box::new(OAuthSuccess {
            tokens,
            user,
        })))
    }

    fn check_configuration(&self) -> Result<(), Error> {
        let missing: Vec<&'static str> = self
            .provider
            .required_fields()
            .iter()
            .filter(|field| !field.is_present(&self.config))
            .map(|field| field.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            error!(
                "Missing {} OAuth configuration: {}",
                self.provider_name(),
                missing.join(", ")
            );
            Err(missing_config_error(self.provider_name(), missing))
        }
    }

    async fn endpoints(&self) -> Result<Endpoints, Error> {
        match self.provider.endpoint_source(&self.config) {
            EndpointSource::Static(endpoints) => Ok(endpoints),
            EndpointSource::Discovery(url) => {
                let document = self
                    .discovery
                    .get_or_try_init(|| discovery::fetch(&self.client, &url))
                    .await?;
                document.endpoints()
            }
        }
    }

    /// Scopes for the authorization redirect.
    fn scopes(&self) -> Vec<String> {
        let mut scopes = self
            .config
            .scope
            .clone()
            .unwrap_or_else(|| self.provider.default_scopes());
        if self.config.email_required() && !scopes.iter().any(|s| s == "email") {
            scopes.push("email".to_string());
        }
        scopes
    }

    async fn authorization_url(
        &self,
        endpoints: &Endpoints,
        redirect_url: &str,
        return_to: Option<String>,
    ) -> Result<Url, Error> {
        let mut url = Url::parse(&endpoints.authorization_url).map_err(|e| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("Invalid authorization endpoint: {}", e),
            )
        })?;
        let state = self.states.issue(return_to).await?;

        let mut params: Vec<(String, String)> = vec![
            ("response_type".to_string(), "code".to_string()),
            (
                "client_id".to_string(),
                self.config.client_id.clone().unwrap_or_default(),
            ),
            ("redirect_uri".to_string(), redirect_url.to_string()),
            ("scope".to_string(), self.scopes().join(" ")),
        ];
        params.extend(self.provider.authorization_params(&self.config));
        params.push(("state".to_string(), state));

        // Explicit parameters override computed ones
        for (key, value) in &self.config.authorization_params {
            match params.iter_mut().find(|(k, _)| k == key) {
                Some(param) => param.1 = value.clone(),
                None => params.push((key.clone(), value.clone())),
            }
        }

        url.query_pairs_mut().extend_pairs(params.iter());
        debug!("Redirecting to {} authorization endpoint", self.provider_name());
        Ok(url)
    }

    async fn exchange_code(
        &self,
        endpoints: &Endpoints,
        code: &str,
        state: Option<&str>,
        redirect_url: &str,
    ) -> Result<TokenResponse, Error> {
        let client_secret = self
            .config
            .client_secret
            .as_ref()
            .map(|secret| secret.expose_secret().as_str())
            .unwrap_or_default();

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_deref().unwrap_or_default()),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_url),
            ("code", code),
        ];
        if let Some(state) = state {
            form.push(("state", state));
        }

        debug!("Exchanging {} authorization code for tokens", self.provider_name());

        let response = self
            .client
            .post(&endpoints.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange {} code: {:?}", self.provider_name(), e);
                Error::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        let payload = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));

        if payload.get("error").is_some() || !status.is_success() {
            let tokens: TokenResponse =
                serde_json::from_value(payload.clone()).unwrap_or_default();
            warn!(
                "{} token endpoint returned {}: {}",
                self.provider_name(),
                status,
                tokens.error_reason()
            );
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("{} login failed: {}", self.provider_name(), tokens.error_reason()),
            )
            .with_data(payload));
        }

        let tokens: TokenResponse = serde_json::from_value(payload.clone()).map_err(|e| {
            http_error(
                HttpErrorKind::Decode,
                &format!("Invalid token response: {}", e),
            )
        })?;
        if tokens.access_token.is_none() {
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("{} login failed: no access token", self.provider_name()),
            )
            .with_data(payload));
        }
        Ok(tokens)
    }

    async fn fetch_user(
        &self,
        endpoints: &Endpoints,
        tokens: &TokenResponse,
    ) -> Result<UserProfile, Error> {
        let response = self
            .client
            .get(&endpoints.userinfo_url)
            .header(AUTHORIZATION, tokens.authorization_header())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get {} user info: {:?}", self.provider_name(), e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} user info request returned {}", self.provider_name(), status);
            return Err(http_error(
                HttpErrorKind::Status(status.as_u16()),
                &format!("{} user info request returned {}", self.provider_name(), status),
            ));
        }

        let body = response.text().await?;
        let user = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                http_error(HttpErrorKind::Decode, &format!("Invalid user info: {}", e))
            })?
        };

        match user {
            Value::Object(claims) if !claims.is_empty() => Ok(UserProfile::new(claims)),
            _ => Err(oauth_error(
                OAuthErrorKind::UserFetchFailed,
                &format!("Could not get {} user", self.provider_name()),
            )
            .with_data(serde_json::to_value(tokens).unwrap_or(Value::Null))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockito::{Matcher, Mock, ServerGuard};
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::error::{ConfigErrorKind, ErrorKind};
    use crate::oauth::providers::{google, okta};

    const CALLBACK_URL: &str = "http://localhost:3000/auth/okta";

    async fn mock_discovery(server: &mut ServerGuard) -> Mock {
        let base = server.url();
        server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "issuer": base,
                    "authorization_endpoint": format!("{}/oauth2/v1/authorize", base),
                    "token_endpoint": format!("{}/oauth2/v1/token", base),
                    "userinfo_endpoint": format!("{}/oauth2/v1/userinfo", base),
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await
    }

    /// Discovery endpoint that is down and must not be called.
    async fn mock_unreachable_discovery(server: &mut ServerGuard) -> Mock {
        server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(503)
            .expect(0)
            .create_async()
            .await
    }

    fn okta_config(server: &ServerGuard) -> ProviderConfig {
        ProviderConfig {
            client_id: Some("a".to_string()),
            client_secret: Some(SecretString::from("b".to_string())),
            domain: Some(server.url()),
            email_required: Some(true),
            ..Default::default()
        }
    }

    fn query_pairs(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    fn callback(code: &str, state: Option<&str>) -> CallbackQuery {
        CallbackQuery {
            code: Some(code.to_string()),
            state: state.map(str::to_string),
            ..Default::default()
        }
    }

    fn expect_redirect(outcome: FlowOutcome) -> Url {
        match outcome {
            FlowOutcome::Redirect(url) => url,
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_contains_standard_parameters() {
        let mut server = mockito::Server::new_async().await;
        let discovery = mock_discovery(&mut server).await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let url = expect_redirect(
            flow.handle(CallbackQuery::default(), CALLBACK_URL)
                .await
                .unwrap(),
        );
        let params = query_pairs(&url);

        assert_eq!(url.path(), "/oauth2/v1/authorize");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "a");
        assert_eq!(params["redirect_uri"], CALLBACK_URL);
        assert_eq!(params["scope"], "openid offline_access email");
        assert_eq!(params["max_age"], "0");
        assert_eq!(params["state"].len(), 64);

        // Discovery is cached per flow
        flow.handle(CallbackQuery::default(), CALLBACK_URL)
            .await
            .unwrap();
        discovery.assert_async().await;
    }

    #[tokio::test]
    async fn test_each_redirect_gets_a_fresh_state() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let first = expect_redirect(
            flow.handle(CallbackQuery::default(), CALLBACK_URL)
                .await
                .unwrap(),
        );
        let second = expect_redirect(
            flow.handle(CallbackQuery::default(), CALLBACK_URL)
                .await
                .unwrap(),
        );
        assert_ne!(query_pairs(&first)["state"], query_pairs(&second)["state"]);
    }

    #[tokio::test]
    async fn test_explicit_authorization_params_override_computed() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let mut config = okta_config(&server);
        config.scope = Some(vec!["openid".to_string(), "email".to_string()]);
        config
            .authorization_params
            .insert("max_age".to_string(), "300".to_string());
        config
            .authorization_params
            .insert("display".to_string(), "popup".to_string());
        let flow = Flow::new(okta::Provider, config).unwrap();

        let url = expect_redirect(
            flow.handle(CallbackQuery::default(), CALLBACK_URL)
                .await
                .unwrap(),
        );
        let max_ages: Vec<_> = url.query_pairs().filter(|(k, _)| k == "max_age").collect();
        assert_eq!(max_ages.len(), 1);
        let params = query_pairs(&url);
        assert_eq!(params["max_age"], "300");
        assert_eq!(params["display"], "popup");
        // email already requested, not duplicated
        assert_eq!(params["scope"], "openid email");
    }

    #[tokio::test]
    async fn test_missing_configuration_fails_before_network() {
        let flow = Flow::new(
            okta::Provider,
            ProviderConfig {
                client_id: Some("a".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let error = flow
            .handle(CallbackQuery::default(), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(
            error.error_kind,
            ErrorKind::Config(ConfigErrorKind::MissingFields(vec![
                "client_secret",
                "domain"
            ]))
        );
        assert_eq!(error.provider.as_deref(), Some("okta"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_successful_login_carries_return_to() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let token = server
            .mock("POST", "/oauth2/v1/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("response_type".into(), "code".into()),
                Matcher::UrlEncoded("client_id".into(), "a".into()),
                Matcher::UrlEncoded("client_secret".into(), "b".into()),
                Matcher::UrlEncoded("code".into(), "abc".into()),
                Matcher::UrlEncoded("redirect_uri".into(), CALLBACK_URL.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"access_token": "at", "token_type": "Bearer", "expires_in": 3600})
                    .to_string(),
            )
            .create_async()
            .await;
        let userinfo = server
            .mock("GET", "/oauth2/v1/userinfo")
            .match_header("authorization", "Bearer at")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"sub": "00u1", "email": "jane@example.com"}).to_string())
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let url = expect_redirect(
            flow.handle(
                CallbackQuery {
                    return_to: Some("/dashboard".to_string()),
                    ..Default::default()
                },
                CALLBACK_URL,
            )
            .await
            .unwrap(),
        );
        let state = query_pairs(&url)["state"].clone();

        let outcome = flow
            .handle(callback("abc", Some(&state)), CALLBACK_URL)
            .await
            .unwrap();
        let success = match outcome {
            FlowOutcome::Authenticated(success) => success,
            other => panic!("expected authenticated, got {:?}", other),
        };

        assert_eq!(success.tokens.access_token.as_deref(), Some("at"));
        assert_eq!(success.user.get("email"), Some(&json!("jane@example.com")));
        assert_eq!(success.user.return_to(), Some("/dashboard"));
        token.assert_async().await;
        userinfo.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_state_is_still_exchanged() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let token = server
            .mock("POST", "/oauth2/v1/token")
            .match_body(Matcher::UrlEncoded("state".into(), "s1".into()))
            .with_status(200)
            .with_body(json!({"access_token": "at", "token_type": "Bearer"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/oauth2/v1/userinfo")
            .with_status(200)
            .with_body(json!({"sub": "00u1"}).to_string())
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let outcome = flow
            .handle(callback("abc", Some("s1")), CALLBACK_URL)
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Authenticated(_)));
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_unknown_state() {
        let mut server = mockito::Server::new_async().await;
        let discovery = mock_unreachable_discovery(&mut server).await;
        let token = server
            .mock("POST", "/oauth2/v1/token")
            .expect(0)
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server))
            .unwrap()
            .with_state_policy(StatePolicy::Strict);

        let error = flow
            .handle(callback("abc", Some("s1")), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(error.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidState));
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        discovery.assert_async().await;
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_error_skips_profile_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let _token = server
            .mock("POST", "/oauth2/v1/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "error": "invalid_grant",
                    "error_description": "The authorization code is invalid or has expired."
                })
                .to_string(),
            )
            .create_async()
            .await;
        let userinfo = server
            .mock("GET", "/oauth2/v1/userinfo")
            .expect(0)
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(callback("abc", Some("s1")), CALLBACK_URL)
            .await
            .unwrap_err();

        assert_eq!(
            error.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
        assert_eq!(error.provider.as_deref(), Some("okta"));
        assert_eq!(error.data.as_ref().unwrap()["error"], "invalid_grant");
        assert_eq!(
            error.message(),
            "okta login failed: The authorization code is invalid or has expired."
        );
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        userinfo.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_payload_in_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let _token = server
            .mock("POST", "/oauth2/v1/token")
            .with_status(200)
            .with_body(json!({"error": "access_denied"}).to_string())
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(callback("abc", None), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(
            error.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_empty_user_info_is_gone() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let _token = server
            .mock("POST", "/oauth2/v1/token")
            .with_status(200)
            .with_body(json!({"access_token": "at", "token_type": "Bearer"}).to_string())
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/oauth2/v1/userinfo")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(callback("abc", None), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(
            error.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::UserFetchFailed)
        );
        assert_eq!(error.status_code(), StatusCode::GONE);
        assert_eq!(error.data.as_ref().unwrap()["access_token"], "at");
    }

    #[tokio::test]
    async fn test_user_info_failure_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let _token = server
            .mock("POST", "/oauth2/v1/token")
            .with_status(200)
            .with_body(json!({"access_token": "at"}).to_string())
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/oauth2/v1/userinfo")
            .with_status(500)
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(callback("abc", None), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(error.error_kind, ErrorKind::Http(HttpErrorKind::Status(500)));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_failed_discovery_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(CallbackQuery::default(), CALLBACK_URL)
            .await
            .unwrap_err();
        assert_eq!(error.error_kind, ErrorKind::Http(HttpErrorKind::Status(503)));
        failing.assert_async().await;
        failing.remove_async().await;

        let _discovery = mock_discovery(&mut server).await;
        let outcome = flow
            .handle(CallbackQuery::default(), CALLBACK_URL)
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Redirect(_)));
    }

    #[tokio::test]
    async fn test_denied_consent_makes_no_network_call() {
        let mut server = mockito::Server::new_async().await;
        let discovery = mock_unreachable_discovery(&mut server).await;
        let token = server
            .mock("POST", "/oauth2/v1/token")
            .expect(0)
            .create_async()
            .await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let error = flow
            .handle(
                CallbackQuery {
                    error: Some("access_denied".to_string()),
                    error_description: Some("User cancelled".to_string()),
                    ..Default::default()
                },
                CALLBACK_URL,
            )
            .await
            .unwrap_err();
        assert_eq!(error.error_kind, ErrorKind::OAuth(OAuthErrorKind::AccessDenied));
        assert_eq!(error.message(), "okta login failed: User cancelled");
        discovery.assert_async().await;
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_share_discovery() {
        let mut server = mockito::Server::new_async().await;
        let discovery = mock_discovery(&mut server).await;
        let flow = Flow::new(okta::Provider, okta_config(&server)).unwrap();

        let (first, second) = tokio::join!(
            flow.handle(CallbackQuery::default(), CALLBACK_URL),
            flow.handle(CallbackQuery::default(), CALLBACK_URL),
        );

        assert!(matches!(first.unwrap(), FlowOutcome::Redirect(_)));
        assert!(matches!(second.unwrap(), FlowOutcome::Redirect(_)));
        discovery.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_url_override() {
        let mut server = mockito::Server::new_async().await;
        let _discovery = mock_discovery(&mut server).await;
        let mut config = okta_config(&server);
        config.redirect_url = Some("https://app.example.com/auth/okta".to_string());
        let flow = Flow::new(okta::Provider, config).unwrap();

        let url = expect_redirect(
            flow.handle(CallbackQuery::default(), CALLBACK_URL)
                .await
                .unwrap(),
        );
        assert_eq!(
            query_pairs(&url)["redirect_uri"],
            "https://app.example.com/auth/okta"
        );
    }

    #[tokio::test]
    async fn test_google_static_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({"access_token": "gat", "token_type": "Bearer"}).to_string())
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer gat")
            .with_status(200)
            .with_body(json!({"sub": "1", "email": "g@example.com"}).to_string())
            .create_async()
            .await;
        let config = ProviderConfig {
            client_id: Some("gid".to_string()),
            client_secret: Some(SecretString::from("gsecret".to_string())),
            token_url: Some(format!("{}/token", base)),
            userinfo_url: Some(format!("{}/userinfo", base)),
            ..Default::default()
        };
        let flow = Flow::new(google::Provider, config).unwrap();

        let url = expect_redirect(
            flow.handle(CallbackQuery::default(), "http://localhost/auth/google")
                .await
                .unwrap(),
        );
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(query_pairs(&url)["scope"], "email profile");

        let outcome = flow
            .handle(callback("code", None), "http://localhost/auth/google")
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Authenticated(success) => {
                assert_eq!(success.user.get("email"), Some(&json!("g@example.com")));
                assert_eq!(success.user.return_to(), None);
            }
            other => panic!("expected authenticated, got {:?}", other),
        }
    }
}
