use crate::controller::{health_check_controller, session_controller};
use axum::{routing::get, Router};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Auth Utils API"
        ),
        paths(
            health_check_controller::health_check,
            session_controller::read,
            session_controller::delete,
        ),
        components(
            schemas(
                crate::session::UserSession,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "auth_utils", description = "OAuth and passkey login helpers")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the cookie session used by the session endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value set by a successful login via Set-Cookie header",
                ))),
            )
        }
    }
}

/// Combine the host's auth routes with the built-in ones.
pub fn define_routes(auth_routes: Router) -> Router {
    Router::new()
        .merge(auth_routes)
        .merge(health_routes())
        .merge(session_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

pub fn session_routes() -> Router {
    Router::new().route(
        "/api/_auth/session",
        get(session_controller::read).delete(session_controller::delete),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_route() {
        let app = define_routes(Router::new());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_openapi_lists_session_paths() {
        let openapi = ApiDoc::openapi();
        assert!(openapi.paths.paths.contains_key("/api/_auth/session"));
        assert!(openapi.paths.paths.contains_key("/health"));
    }
}
