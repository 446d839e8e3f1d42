//! Error types for the `auth-flows` crate.
//!
//! A root Error struct carries an error kind, an optional source for chaining, and the
//! diagnostic context a host needs to report the failure (provider name and upstream payload).

use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

/// Top-level error type for auth-flows crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
    /// Identity provider the failing flow belongs to, if any.
    pub provider: Option<String>,
    /// Upstream payload (token error body, token response, etc.).
    pub data: Option<Value>,
}

/// Major categories of errors in auth-flows.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    OAuth(OAuthErrorKind),
    Http(HttpErrorKind),
    WebAuthn(WebAuthnErrorKind),
}

/// Errors from resolving provider configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    /// Required fields are absent after merging all configuration layers.
    MissingFields(Vec<&'static str>),
    /// A configured value could not be used (e.g. an unparsable URL).
    Invalid,
}

/// Errors from the OAuth authorization-code exchange.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The provider redirected back with an `error` instead of a `code`.
    AccessDenied,
    /// The token endpoint answered with an OAuth error payload.
    TokenExchangeFailed,
    /// The callback `state` was not issued by this flow (strict policy only).
    InvalidState,
    /// The user-info endpoint returned nothing usable.
    UserFetchFailed,
    /// A provider document or response was missing required fields.
    InvalidResponse,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
    Status(u16),
    Decode,
}

/// Errors from WebAuthn ceremonies.
#[derive(Debug, PartialEq)]
pub enum WebAuthnErrorKind {
    ChallengeNotFound,
    ChallengeMismatch,
    CredentialNotFound,
    UnexpectedType,
    OriginMismatch,
    RpIdMismatch,
    UserNotPresent,
    UserNotVerified,
    InvalidSignature,
    CounterRegression,
    UnsupportedAlgorithm,
    Malformed,
    Storage,
}

impl Error {
    /// Attach the provider name to this error.
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// Attach an upstream payload to this error.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// HTTP status a host should answer with when no error callback handles this error.
    pub fn status_code(&self) -> StatusCode {
        match &self.error_kind {
            ErrorKind::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::OAuth(OAuthErrorKind::UserFetchFailed) => StatusCode::GONE,
            ErrorKind::OAuth(OAuthErrorKind::InvalidResponse) => StatusCode::BAD_GATEWAY,
            ErrorKind::OAuth(_) => StatusCode::UNAUTHORIZED,
            ErrorKind::Http(_) => StatusCode::BAD_GATEWAY,
            ErrorKind::WebAuthn(WebAuthnErrorKind::Malformed) => StatusCode::BAD_REQUEST,
            ErrorKind::WebAuthn(WebAuthnErrorKind::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::WebAuthn(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Human-readable message, including the source message when there is one.
    pub fn message(&self) -> String {
        match &self.source {
            Some(source) => source.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
            ErrorKind::WebAuthn(kind) => write!(f, "WebAuthn error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_decode() {
            ErrorKind::Http(HttpErrorKind::Decode)
        } else if let Some(status) = err.status() {
            ErrorKind::Http(HttpErrorKind::Status(status.as_u16()))
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
            provider: None,
            data: None,
        }
    }
}

fn with_message(error_kind: ErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind,
        provider: None,
        data: None,
    }
}

/// Helper function to create a missing-configuration error for a provider.
pub fn missing_config_error(provider: &str, fields: Vec<&'static str>) -> Error {
    let message = format!(
        "Missing {} OAuth configuration: {}",
        provider,
        fields.join(", ")
    );
    with_message(ErrorKind::Config(ConfigErrorKind::MissingFields(fields)), &message)
        .with_provider(provider)
}

/// Helper function to create invalid-configuration errors.
pub fn config_error(message: &str) -> Error {
    with_message(ErrorKind::Config(ConfigErrorKind::Invalid), message)
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    with_message(ErrorKind::OAuth(kind), message)
}

/// Helper function to create HTTP errors.
pub fn http_error(kind: HttpErrorKind, message: &str) -> Error {
    with_message(ErrorKind::Http(kind), message)
}

/// Helper function to create WebAuthn errors.
pub fn webauthn_error(kind: WebAuthnErrorKind, message: &str) -> Error {
    with_message(ErrorKind::WebAuthn(kind), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_config_error_names_fields() {
        let error = missing_config_error("okta", vec!["client_id", "domain"]);
        assert_eq!(
            error.error_kind,
            ErrorKind::Config(ConfigErrorKind::MissingFields(vec!["client_id", "domain"]))
        );
        assert_eq!(error.provider.as_deref(), Some("okta"));
        assert_eq!(
            error.message(),
            "Missing okta OAuth configuration: client_id, domain"
        );
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            oauth_error(OAuthErrorKind::TokenExchangeFailed, "x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            oauth_error(OAuthErrorKind::UserFetchFailed, "x").status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            http_error(HttpErrorKind::Network, "x").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            webauthn_error(WebAuthnErrorKind::ChallengeMismatch, "x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            webauthn_error(WebAuthnErrorKind::Malformed, "x").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_with_data_keeps_payload() {
        let error = oauth_error(OAuthErrorKind::TokenExchangeFailed, "okta login failed")
            .with_provider("okta")
            .with_data(json!({"error": "invalid_grant"}));
        assert_eq!(error.data, Some(json!({"error": "invalid_grant"})));
        assert_eq!(error.message(), "okta login failed");
    }
}
