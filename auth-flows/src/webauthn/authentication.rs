//! Passkey login: issue a challenge, then verify the signed assertion.

use std::sync::Arc;

use log::*;

use super::data::{
    decode_base64url, random_base64url, verify_assertion_signature, verifying_key_from_cose,
    AuthenticatorData, ClientData,
};
use super::store::{ChallengeStore, CredentialStore};
use super::types::{
    AuthenticationResponse, AuthenticationResult, RelyingParty, RequestOptions, UserVerification,
};
use super::{CHALLENGE_LEN, DEFAULT_TIMEOUT_MS};
use crate::error::{webauthn_error, Error, WebAuthnErrorKind};

/// Authentication ceremony bound to one relying party and its stores.
pub struct AuthenticationCeremony {
    rp: RelyingParty,
    challenges: Arc<dyn ChallengeStore>,
    credentials: Arc<dyn CredentialStore>,
    timeout: u64,
    user_verification: UserVerification,
}

impl AuthenticationCeremony {
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

    /// Client-side timeout, in milliseconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.rp
    }

    /// Issue a challenge for a login attempt.
    ///
    /// Without a user name the allow list is empty and the browser offers discoverable
    /// credentials.
    pub async fn options(&self, user_name: Option<&str>) -> Result<RequestOptions, Error> {
        let allow_credentials = match user_name {
            Some(user_name) => self.credentials.allow_credentials(user_name).await?,
            None => Vec::new(),
        };

        let attempt_id = random_base64url(16);
        let challenge = random_base64url(CHALLENGE_LEN);
        self.challenges
            .store_challenge(&attempt_id, &challenge)
            .await?;
        debug!("Issued WebAuthn authentication challenge for attempt {}", attempt_id);

        Ok(RequestOptions {
            attempt_id,
            challenge,
            rp_id: self.rp.id.clone(),
            timeout: self.timeout,
            user_verification: self.user_verification,
            allow_credentials,
        })
    }

    /// Verify an assertion against the challenge issued for `attempt_id`.
    pub async fn verify(
        &self,
        attempt_id: &str,
        response: &AuthenticationResponse,
    ) -> Result<AuthenticationResult, Error> {
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
            "webauthn.get",
            &expected_challenge,
            &self.rp.origin,
        )?;

        let mut credential = self
            .credentials
            .get_credential(&response.id)
            .await?
            .ok_or_else(|| {
                warn!("Assertion for unknown credential {}", response.id);
                webauthn_error(
                    WebAuthnErrorKind::CredentialNotFound,
                    "Credential is not registered",
                )
            })?;

        let raw_authenticator_data =
            decode_base64url(&response.response.authenticator_data, "authenticatorData")?;
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

        let public_key = decode_base64url(&credential.public_key, "publicKey")?;
        let key = verifying_key_from_cose(&public_key)?;
        let signature = decode_base64url(&response.response.signature, "signature")?;
        verify_assertion_signature(&key, &raw_authenticator_data, &client_data_json, &signature)?;

        let new_counter = authenticator_data.sign_count;
        if (new_counter != 0 || credential.counter != 0) && new_counter <= credential.counter {
            warn!(
                "Signature counter for credential {} went from {} to {}",
                credential.id, credential.counter, new_counter
            );
            return Err(webauthn_error(
                WebAuthnErrorKind::CounterRegression,
                "Signature counter did not advance; the authenticator may be cloned",
            ));
        }

        credential.counter = new_counter;
        credential.backed_up = authenticator_data.backed_up();
        info!("WebAuthn authentication succeeded for {}", credential.user_name);

        Ok(AuthenticationResult {
            credential,
            user_verified: authenticator_data.user_verified(),
        })
    }
}
