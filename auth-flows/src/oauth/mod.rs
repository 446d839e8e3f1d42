//! OAuth 2.0 authorization-code login.
//!
//! A [`Flow`] pairs a [`Provider`] description with merged [`ProviderConfig`] and drives
//! the redirect, code exchange and user-info fetch.

mod config;
mod provider;

pub mod discovery;
pub mod flow;
pub mod providers;
pub mod state;
pub mod token;

pub use config::ProviderConfig;
pub use flow::{CallbackQuery, Flow, FlowOutcome, OAuthSuccess, StatePolicy, UserProfile};
pub use provider::{EndpointSource, Endpoints, Provider, ProviderKind, RequiredField};
pub use state::{MemoryStateStore, PendingState, StateStore};
pub use token::TokenResponse;
