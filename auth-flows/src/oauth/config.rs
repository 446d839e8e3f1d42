//! Per-provider OAuth configuration and layered merging.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::Deserialize;

/// Configuration for one OAuth provider.
///
/// Every field is optional so that call-site, environment and provider-default layers
/// can be merged with [`ProviderConfig::merge`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// OAuth client identifier.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<SecretString>,
    /// Issuer domain, e.g. `dev-123.okta.com`.
    pub domain: Option<String>,
    /// Custom authorization server id (Okta).
    pub authorization_server: Option<String>,
    /// API audience requested in the authorization redirect.
    pub audience: Option<String>,
    /// Requested scopes; provider defaults apply when unset.
    pub scope: Option<Vec<String>>,
    /// Adds the `email` scope when it is not already requested.
    pub email_required: Option<bool>,
    /// Maximum elapsed seconds since the user last authenticated.
    pub max_age: Option<u64>,
    /// Named login connection (e.g. a social identity provider).
    pub connection: Option<String>,
    /// Extra parameters for the authorization URL; applied last.
    #[serde(default)]
    pub authorization_params: BTreeMap<String, String>,
    /// Redirect URL override, for deployments where the public host can't be inferred.
    pub redirect_url: Option<String>,
    /// Authorization endpoint override for providers with static endpoints.
    pub authorization_url: Option<String>,
    /// Token endpoint override for providers with static endpoints.
    pub token_url: Option<String>,
    /// User-info endpoint override for providers with static endpoints.
    pub userinfo_url: Option<String>,
}

impl ProviderConfig {
    /// Merge `fallback` under `self`: values set on `self` win field by field, and
    /// `authorization_params` are merged key by key with `self`'s keys winning.
    pub fn merge(self, fallback: ProviderConfig) -> ProviderConfig {
        let mut authorization_params = fallback.authorization_params;
        authorization_params.extend(self.authorization_params);

        ProviderConfig {
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
            domain: self.domain.or(fallback.domain),
            authorization_server: self.authorization_server.or(fallback.authorization_server),
            audience: self.audience.or(fallback.audience),
            scope: self.scope.or(fallback.scope),
            email_required: self.email_required.or(fallback.email_required),
            max_age: self.max_age.or(fallback.max_age),
            connection: self.connection.or(fallback.connection),
            authorization_params,
            redirect_url: self.redirect_url.or(fallback.redirect_url),
            authorization_url: self.authorization_url.or(fallback.authorization_url),
            token_url: self.token_url.or(fallback.token_url),
            userinfo_url: self.userinfo_url.or(fallback.userinfo_url),
        }
    }

    /// Whether the `email` scope must be requested.
    pub fn email_required(&self) -> bool {
        self.email_required.unwrap_or(false)
    }
}
