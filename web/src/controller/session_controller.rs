use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

use crate::session::{clear_user_session, get_user_session};
use crate::{AuthEvent, Error};

/// GET the current user session
///
/// Returns `{}` when nobody is logged in.
#[utoipa::path(
    get,
    path = "/api/_auth/session",
    responses(
        (status = 200, description = "The current user session, or an empty object", body = crate::session::UserSession),
        (status = 500, description = "Session store failure")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn read(event: AuthEvent) -> Result<Response, Error> {
    match get_user_session(event.session()?).await? {
        Some(user_session) => Ok(Json(user_session).into_response()),
        None => Ok(Json(json!({})).into_response()),
    }
}

/// DELETE the current user session (log out)
#[utoipa::path(
    delete,
    path = "/api/_auth/session",
    responses(
        (status = 200, description = "Session cleared"),
        (status = 500, description = "Session store failure")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn delete(event: AuthEvent) -> Result<impl IntoResponse, Error> {
    clear_user_session(event.session()?).await?;
    info!("User logged out");
    Ok((StatusCode::OK, Json(json!({"loggedOut": true}))))
}
