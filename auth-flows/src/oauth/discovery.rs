//! OpenID Connect discovery documents.

use log::*;
use serde::Deserialize;

use super::Endpoints;
use crate::error::{http_error, oauth_error, Error, HttpErrorKind, OAuthErrorKind};

/// The subset of an OpenID provider configuration document the flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: Option<String>,
}

impl DiscoveryDocument {
    /// Endpoints advertised by this document.
    pub fn endpoints(&self) -> Result<Endpoints, Error> {
        let userinfo_url = self.userinfo_endpoint.clone().ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                "Discovery document has no userinfo_endpoint",
            )
        })?;
        Ok(Endpoints {
            authorization_url: self.authorization_endpoint.clone(),
            token_url: self.token_endpoint.clone(),
            userinfo_url,
        })
    }
}

/// Fetch and decode a discovery document.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<DiscoveryDocument, Error> {
    debug!("Fetching OpenID configuration from {}", url);

    let response = client.get(url).send().await.map_err(|e| {
        warn!("Failed to fetch OpenID configuration: {:?}", e);
        Error::from(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!("OpenID configuration request returned {}", status);
        return Err(http_error(
            HttpErrorKind::Status(status.as_u16()),
            &format!("Discovery document request to {} returned {}", url, status),
        ));
    }

    let document: DiscoveryDocument = response.json().await.map_err(|e| {
        warn!("Failed to parse OpenID configuration: {:?}", e);
        Error::from(e)
    })?;

    info!(
        "Loaded OpenID configuration for issuer {}",
        document.issuer.as_deref().unwrap_or(url)
    );
    Ok(document)
}
