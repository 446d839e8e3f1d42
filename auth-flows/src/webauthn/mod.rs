//! WebAuthn (passkey) ceremonies.
//!
//! ## Flow Overview
//!
//! Both ceremonies take two requests:
//! 1. The client asks for options; a random challenge is stored under a fresh attempt id.
//! 2. The client returns the authenticator's output with that attempt id; the challenge is
//!    taken from the [`ChallengeStore`] and the output verified against it.
//!
//! Only ES256 credentials are supported. Registration requests `none` attestation and
//! does not verify attestation statements.

pub mod authentication;
pub mod data;
pub mod registration;
pub mod store;
pub mod types;

pub use authentication::AuthenticationCeremony;
pub use registration::{RegistrationCeremony, RegistrationUser};
pub use store::{ChallengeStore, CredentialStore, MemoryChallengeStore, MemoryCredentialStore};
pub use types::{
    AuthenticationResponse, AuthenticationResult, CredentialDescriptor, CreationOptions,
    RegistrationResponse, RegistrationResult, RelyingParty, RequestOptions, UserVerification,
    WebAuthnCredential,
};

/// Challenge size in bytes.
pub(crate) const CHALLENGE_LEN: usize = 32;

/// Client-side ceremony timeout, in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 60_000;
