use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde::Serialize;
use serde_json::Value;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A login or passkey ceremony failed.
    Auth(auth_flows::Error),
    /// The session store failed, or no session layer is installed.
    Session(tower_sessions::session::Error),
    /// Session extraction failed because the route has no session layer.
    MissingSession,
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Auth(error) => StatusCode::from_u16(error.status_code().as_u16())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Error::Session(_) | Error::MissingSession => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn body(&self) -> ErrorBody {
        let status_code = self.status_code().as_u16();
        match self {
            Error::Auth(error) => ErrorBody {
                status_code,
                message: error.message(),
                provider: error.provider.clone(),
                data: error.data.clone(),
            },
            Error::Session(error) => ErrorBody {
                status_code,
                message: format!("Session error: {error}"),
                provider: None,
                data: None,
            },
            Error::MissingSession => ErrorBody {
                status_code,
                message: "No session layer is installed for this route".to_string(),
                provider: None,
                data: None,
            },
        }
    }
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.body();
        if status.is_server_error() {
            error!("{} {}", status, body.message);
        } else {
            warn!("{} {}", status, body.message);
        }
        (status, Json(body)).into_response()
    }
}

impl From<auth_flows::Error> for Error {
    fn from(err: auth_flows::Error) -> Self {
        Error::Auth(err)
    }
}

impl From<tower_sessions::session::Error> for Error {
    fn from(err: tower_sessions::session::Error) -> Self {
        Error::Session(err)
    }
}
