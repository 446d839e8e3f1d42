//! Passkey creation: issue creation options, then verify the attestation.

use std::sync::Arc;

use log::*;

use super::data::{
    decode_base64url, encode_base64url, parse_attestation_object, random_base64url,
    verifying_key_from_cose, AuthenticatorData, ClientData, COSE_ALG_ES256,
};
use super::store::{ChallengeStore, CredentialStore};
use super::types::{
    AuthenticatorSelection, CreationOptions, PublicKeyCredentialParameters, RegistrationResponse,
    RegistrationResult, RelyingParty, RelyingPartyEntity, UserEntity, UserVerification,
    WebAuthnCredential,
};
use super::{CHALLENGE_LEN, DEFAULT_TIMEOUT_MS};
use crate::error::{webauthn_error, Error, WebAuthnErrorKind};

/// The user a credential is being created for.
#[derive(Debug, Clone)]
pub struct RegistrationUser {
    pub user_name: String,
    pub display_name: Option<String>,
}

/// Registration ceremony bound to one relying party and its stores.
pub struct RegistrationCeremony {
    rp: RelyingParty,
    challenges: Arc<dyn ChallengeStore>,
    credentials: Arc<dyn CredentialStore>,
    timeout: u64,
    user_verification: UserVerification,
}

impl RegistrationCeremony {
    pub fn new(
        rp: RelyingParty,
        challenges: Arc<dyn ChallengeStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            rp,
            challenges,
            credentials,
            timeout: DEFAULT_TIMEOUT_MS,
            user_verification: UserVerification::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    /// Issue creation options for `user`, excluding credentials they already hold.
    pub async fn options(&self, user: &RegistrationUser) -> Result<CreationOptions, Error> {
        let exclude_credentials = self
            .credentials
            .exclude_credentials(&user.user_name)
            .await?;

        let attempt_id = random_base64url(16);
        let challenge = random_base64url(CHALLENGE_LEN);
        self.challenges
            .store_challenge(&attempt_id, &challenge)
            .await?;
        debug!(
            "Issued WebAuthn registration challenge for {} (attempt {})",
            user.user_name, attempt_id
        );

        Ok(CreationOptions {
            attempt_id,
            challenge,
            rp: RelyingPartyEntity {
                id: self.rp.id.clone(),
                name: self.rp.name.clone(),
            },
            user: UserEntity {
                id: encode_base64url(user.user_name.as_bytes()),
                name: user.user_name.clone(),
                display_name: user
                    .display_name
                    .clone()
                    .unwrap_or_else(|| user.user_name.clone()),
            },
            pub_key_cred_params: vec![PublicKeyCredentialParameters {
                credential_type: "public-key".to_string(),
                alg: COSE_ALG_ES256,
            }],
            timeout: self.timeout,
            attestation: "none".to_string(),
            exclude_credentials,
            authenticator_selection: AuthenticatorSelection {
                resident_key: "preferred".to_string(),
                user_verification: self.user_verification,
            },
        })
    }

    /// Verify an attestation and build the credential to store for `user_name`.
    ///
    /// The attestation statement itself is not checked.
    pub async fn verify(
        &self,
        attempt_id: &str,
        user_name: &str,
        response: &RegistrationResponse,
    ) -> Result<RegistrationResult, Error> {
        let expected_challenge = self
            .challenges
            .get_challenge(attempt_id)
            .await?
            .ok_or_else(|| {
                webauthn_error(
                    WebAuthnErrorKind::ChallengeNotFound,
                    "No challenge was issued for this attempt, or it expired",
                )
            })?;

        let client_data_json =
            decode_base64url(&response.response.client_data_json, "clientDataJSON")?;
        ClientData::parse(&client_data_json)?.check(
            "webauthn.create",
            &expected_challenge,
            &self.rp.origin,
        )?;

        let attestation_object =
            decode_base64url(&response.response.attestation_object, "attestationObject")?;
        let (fmt, raw_authenticator_data) = parse_attestation_object(&attestation_object)?;
        trace!("Attestation format {}", fmt);

        let authenticator_data = AuthenticatorData::parse(&raw_authenticator_data)?;
        authenticator_data.check_rp_id(&self.rp.id)?;
        if !authenticator_data.user_present() {
            return Err(webauthn_error(
                WebAuthnErrorKind::UserNotPresent,
                "Authenticator did not report user presence",
            ));
        }
        if self.user_verification == UserVerification::Required
            && !authenticator_data.user_verified()
        {
            return Err(webauthn_error(
                WebAuthnErrorKind::UserNotVerified,
                "User verification is required",
            ));
        }

        let attested = authenticator_data
            .attested_credential
            .as_ref()
            .ok_or_else(|| {
                webauthn_error(
                    WebAuthnErrorKind::Malformed,
                    "Attestation carries no credential data",
                )
            })?;
        // Rejects anything but ES256 before the key is stored
        verifying_key_from_cose(&attested.public_key)?;

        let credential = WebAuthnCredential {
            id: encode_base64url(&attested.credential_id),
            public_key: encode_base64url(&attested.public_key),
            user_name: user_name.to_string(),
            counter: authenticator_data.sign_count,
            transports: response.response.transports.clone(),
            backed_up: authenticator_data.backed_up(),
        };
        info!("Registered WebAuthn credential for {}", user_name);

        Ok(RegistrationResult {
            credential,
            user_verified: authenticator_data.user_verified(),
        })
    }
}
