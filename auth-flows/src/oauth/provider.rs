//! OAuth provider description trait and types.

use serde::{Deserialize, Serialize};

use super::ProviderConfig;

/// Known OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Okta,
    Google,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Okta => "okta",
            ProviderKind::Google => "google",
        }
    }
}

/// Resolved provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorization_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Where a provider's endpoints come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSource {
    /// OpenID Connect discovery document URL.
    Discovery(String),
    /// Endpoints known up front.
    Static(Endpoints),
}

/// Configuration fields a provider cannot work without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    ClientId,
    ClientSecret,
    Domain,
}

impl RequiredField {
    /// Field name as it appears in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::ClientId => "client_id",
            RequiredField::ClientSecret => "client_secret",
            RequiredField::Domain => "domain",
        }
    }

    /// Whether the field carries a non-empty value in `config`.
    pub fn is_present(&self, config: &ProviderConfig) -> bool {
        match self {
            RequiredField::ClientId => config.client_id.as_deref().is_some_and(|v| !v.is_empty()),
            RequiredField::ClientSecret => config.client_secret.is_some(),
            RequiredField::Domain => config.domain.as_deref().is_some_and(|v| !v.is_empty()),
        }
    }
}

/// Description of an OAuth 2.0 / OIDC identity provider.
///
/// Implementations only describe the provider: endpoints, defaults, and the
/// provider-specific authorization parameters. The redirect, exchange and profile fetch
/// are driven by [`super::Flow`].
pub trait Provider: Send + Sync {
    /// Get the provider kind.
    fn kind(&self) -> ProviderKind;

    /// Fields that must be configured before the flow can run.
    fn required_fields(&self) -> &'static [RequiredField] {
        &[RequiredField::ClientId, RequiredField::ClientSecret]
    }

    /// Provider defaults, merged under runtime and call-site configuration.
    fn defaults(&self) -> ProviderConfig {
        ProviderConfig::default()
    }

    /// Scopes requested when none are configured.
    fn default_scopes(&self) -> Vec<String>;

    /// Where to find the authorization, token and user-info endpoints.
    ///
    /// Only called once required fields have been checked.
    fn endpoint_source(&self, config: &ProviderConfig) -> EndpointSource;

    /// Provider-specific parameters added to the authorization redirect, before
    /// caller-supplied `authorization_params`.
    fn authorization_params(&self, _config: &ProviderConfig) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_provider_kind_as_str() {
        assert_eq!(ProviderKind::Okta.as_str(), "okta");
        assert_eq!(ProviderKind::Google.as_str(), "google");
    }

    #[test]
    fn test_required_field_presence() {
        let config = ProviderConfig {
            client_id: Some(String::new()),
            client_secret: Some(SecretString::from("b".to_string())),
            ..Default::default()
        };
        assert!(!RequiredField::ClientId.is_present(&config));
        assert!(RequiredField::ClientSecret.is_present(&config));
        assert!(!RequiredField::Domain.is_present(&config));
    }
}
