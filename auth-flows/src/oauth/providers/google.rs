//! Google OAuth provider description.

use crate::oauth::{EndpointSource, Endpoints, ProviderConfig, ProviderKind};

const AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Google identity provider with well-known static endpoints.
///
/// Endpoint overrides in [`ProviderConfig`] take precedence, which is how tests point the
/// flow at a mock server.
#[derive(Debug, Clone, Copy, Default)]
pub struct Provider;

impl crate::oauth::Provider for Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn default_scopes(&self) -> Vec<String> {
        vec!["email".to_string(), "profile".to_string()]
    }

    fn endpoint_source(&self, config: &ProviderConfig) -> EndpointSource {
        EndpointSource::Static(Endpoints {
            authorization_url: config
                .authorization_url
                .clone()
                .unwrap_or_else(|| AUTHORIZATION_URL.to_string()),
            token_url: config
                .token_url
                .clone()
                .unwrap_or_else(|| TOKEN_URL.to_string()),
            userinfo_url: config
                .userinfo_url
                .clone()
                .unwrap_or_else(|| USERINFO_URL.to_string()),
        })
    }
}
