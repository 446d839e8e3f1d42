//! Okta OAuth provider description.

use crate::oauth::{EndpointSource, ProviderConfig, ProviderKind, RequiredField};

/// Okta identity provider.
///
/// Endpoints come from the OpenID Connect discovery document of the org authorization
/// server, or of a custom authorization server when `authorization_server` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Provider;

const REQUIRED: &[RequiredField] = &[
    RequiredField::ClientId,
    RequiredField::ClientSecret,
    RequiredField::Domain,
];

/// Base URL for an Okta domain; a domain that already has a scheme is used as-is.
fn issuer_base(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

impl crate::oauth::Provider for Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Okta
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        REQUIRED
    }

    fn default_scopes(&self) -> Vec<String> {
        vec!["openid".to_string(), "offline_access".to_string()]
    }

    fn endpoint_source(&self, config: &ProviderConfig) -> EndpointSource {
        let base = issuer_base(config.domain.as_deref().unwrap_or_default());
        let url = match config.authorization_server.as_deref() {
            Some(server) if !server.is_empty() => format!(
                "{}/oauth2/{}/.well-known/openid-configuration",
                base, server
            ),
            _ => format!("{}/.well-known/openid-configuration", base),
        };
        EndpointSource::Discovery(url)
    }

    fn authorization_params(&self, config: &ProviderConfig) -> Vec<(String, String)> {
        vec![
            (
                "audience".to_string(),
                config.audience.clone().unwrap_or_default(),
            ),
            (
                "max_age".to_string(),
                config.max_age.unwrap_or(0).to_string(),
            ),
            (
                "connection".to_string(),
                config.connection.clone().unwrap_or_default(),
            ),
        ]
    }
}
