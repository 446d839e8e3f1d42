//! Request and response types for WebAuthn ceremonies.
//!
//! Field names follow the browser's JSON shapes (`PublicKeyCredentialRequestOptions`,
//! `PublicKeyCredentialCreationOptions`, and the serialized `PublicKeyCredential`), so
//! these types can be passed to and from `navigator.credentials` directly.

use serde::{Deserialize, Serialize};

/// Relying party the ceremonies run for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Effective domain, e.g. `example.com`.
    pub id: String,
    /// Human-palatable name shown by authenticators.
    pub name: String,
    /// Origin the browser reports in client data, e.g. `https://example.com`.
    pub origin: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

/// A passkey registered to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnCredential {
    /// Credential id, base64url.
    pub id: String,
    /// CBOR COSE public key, base64url.
    pub public_key: String,
    /// Owner of the credential.
    pub user_name: String,
    pub counter: u32,
    #[serde(default)]
    pub transports: Vec<String>,
    #[serde(default)]
    pub backed_up: bool,
}

impl WebAuthnCredential {
    pub fn descriptor(&self) -> CredentialDescriptor {
        CredentialDescriptor {
            credential_type: "public-key".to_string(),
            id: self.id.clone(),
            transports: self.transports.clone(),
        }
    }
}

/// Entry of an allow or exclude list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

/// Options for `navigator.credentials.get`, plus the attempt id to echo back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub attempt_id: String,
    pub challenge: String,
    pub rp_id: String,
    pub timeout: u64,
    pub user_verification: UserVerification,
    pub allow_credentials: Vec<CredentialDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelyingPartyEntity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque user handle, base64url.
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub alg: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub user_verification: UserVerification,
}

/// Options for `navigator.credentials.create`, plus the attempt id to echo back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub attempt_id: String,
    pub challenge: String,
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u64,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Serialized assertion returned by `navigator.credentials.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    #[serde(default)]
    pub raw_id: Option<String>,
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,
    pub response: AssertionResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

/// Serialized attestation returned by `navigator.credentials.create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    #[serde(default)]
    pub raw_id: Option<String>,
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,
    pub response: AttestationResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Vec<String>,
}

/// A verified assertion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    /// The credential, with its counter and backup state updated from this assertion.
    pub credential: WebAuthnCredential,
    pub user_verified: bool,
}

/// A verified attestation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub credential: WebAuthnCredential,
    pub user_verified: bool,
}
