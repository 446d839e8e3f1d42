use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap, Method, Uri};
use tower_sessions::Session;

use crate::Error;

/// The request an auth handler is running for, handed to every callback.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    session: Option<Session>,
}

impl AuthEvent {
    /// The cookie session, when a `SessionManagerLayer` wraps the route.
    pub fn session(&self) -> Result<&Session, Error> {
        self.session.as_ref().ok_or(Error::MissingSession)
    }

    /// Absolute URL of this request without its query string.
    ///
    /// Honors `x-forwarded-proto` and `x-forwarded-host` so the URL matches what the
    /// browser sees behind a proxy.
    pub fn request_url(&self) -> String {
        let header = |name: &str| {
            self.headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(|value| value.trim().to_string())
        };

        let scheme = header("x-forwarded-proto")
            .or_else(|| self.uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        let host = header("x-forwarded-host")
            .or_else(|| header("host"))
            .or_else(|| self.uri.authority().map(|authority| authority.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        format!("{}://{}{}", scheme, host, self.uri.path())
    }
}

impl<S> FromRequestParts<S> for AuthEvent
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await.ok();

        Ok(AuthEvent {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            session,
        })
    }
}
