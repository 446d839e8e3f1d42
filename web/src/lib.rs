//! axum surface for the `auth-flows` handlers.
//!
//! The host builds its auth routes with [`oauth_handler`], [`authenticate_handler`] and
//! [`register_handler`], supplying callbacks that finish the login, and serves them with
//! [`init_server`].

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use log::*;
use service::config::Config;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

mod callbacks;
mod controller;
mod error;
mod extractors;
pub mod provider_config;
mod router;
pub mod session;

pub use callbacks::{OAuthCallbacks, WebAuthnCallbacks};
pub use controller::oauth_controller::oauth_handler;
pub use controller::webauthn_controller::{
    authenticate_handler, register_handler, WebAuthnRequest,
};
pub use error::{Error, Result};
pub use extractors::auth_event::AuthEvent;
pub use router::{define_routes, session_routes};

/// Serve `auth_routes` plus the built-in routes until the process is stopped.
pub async fn init_server(config: Config, auth_routes: Router) -> std::io::Result<()> {
    let app = define_routes(auth_routes)
        .layer(session_layer(&config))
        .layer(cors_layer(&config));

    let interface = config.interface.as_deref().unwrap_or("127.0.0.1");
    let listener = TcpListener::bind(format!("{}:{}", interface, config.port)).await?;

    info!(
        "Server starting... listening for connections on http://{}:{}",
        interface, config.port
    );

    axum::serve(listener, app).await
}

/// Cookie sessions kept in memory. `SameSite=Lax` so the session survives the provider's
/// redirect back to the callback route.
pub fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.is_production())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.session_expiry_seconds as i64,
        )))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}
