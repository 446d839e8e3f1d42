//! Provider settings read from the service `Config` (flags, environment and `.env`).
//!
//! These form the middle configuration layer: values passed in code are merged over them.

use auth_flows::oauth::ProviderConfig;
use auth_flows::webauthn::RelyingParty;
use service::config::Config;

pub fn okta(config: &Config) -> ProviderConfig {
    ProviderConfig {
        client_id: config.oauth_okta_client_id(),
        client_secret: config.oauth_okta_client_secret().map(Into::into),
        domain: config.oauth_okta_domain(),
        authorization_server: config.oauth_okta_auth_server_id(),
        audience: config.oauth_okta_audience(),
        redirect_url: config.oauth_okta_redirect_url(),
        ..Default::default()
    }
}

pub fn google(config: &Config) -> ProviderConfig {
    ProviderConfig {
        client_id: config.oauth_google_client_id(),
        client_secret: config.oauth_google_client_secret().map(Into::into),
        redirect_url: config.oauth_google_redirect_url(),
        ..Default::default()
    }
}

pub fn relying_party(config: &Config) -> RelyingParty {
    RelyingParty {
        id: config.webauthn_rp_id.clone(),
        name: config.webauthn_rp_name.clone(),
        origin: config.webauthn_origin.clone(),
    }
}
