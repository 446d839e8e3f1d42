//! # auth-flows
//!
//! Protocol core for provider logins and passkeys:
//! - OAuth 2.0 / OpenID Connect authorization-code flow, one generic state machine
//!   parameterized by a provider description (Okta, Google)
//! - Pending authorization state with TTL expiry
//! - WebAuthn authentication and registration ceremonies
//! - HTTP client building
//!
//! ## Architecture
//!
//! Nothing in this crate owns durable state. Pending OAuth states, WebAuthn challenges and
//! credentials all live behind small traits the host application implements (in-memory
//! implementations are provided). The `web` crate turns these flows into axum routes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_flows::oauth::{providers::okta, CallbackQuery, Flow, FlowOutcome, ProviderConfig};
//!
//! let flow = Flow::new(okta::Provider, ProviderConfig::default())?;
//! match flow.handle(CallbackQuery::default(), "https://app.example.com/auth/okta").await? {
//!     FlowOutcome::Redirect(url) => { /* send the browser to url */ }
//!     FlowOutcome::Authenticated(success) => { /* establish a session */ }
//! }
//! ```

pub mod error;
pub mod http;
pub mod oauth;
pub mod webauthn;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
