//! Decoding of the binary structures a WebAuthn client sends back.
//!
//! Covers `clientDataJSON`, authenticator data, CBOR attestation objects and COSE
//! EC2 public keys, plus the ES256 assertion signature check.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::value::Value;
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{webauthn_error, Error, WebAuthnErrorKind};

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_BACKUP_ELIGIBLE: u8 = 0x08;
const FLAG_BACKED_UP: u8 = 0x10;
const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

// COSE labels
const COSE_KTY: i128 = 1;
const COSE_ALG: i128 = 3;
const COSE_EC2_CRV: i128 = -1;
const COSE_EC2_X: i128 = -2;
const COSE_EC2_Y: i128 = -3;
const COSE_KTY_EC2: i128 = 2;
const COSE_CRV_P256: i128 = 1;

/// COSE algorithm identifier for ES256.
pub const COSE_ALG_ES256: i64 = -7;

fn malformed(message: &str) -> Error {
    webauthn_error(WebAuthnErrorKind::Malformed, message)
}

/// Random base64url string over `len` bytes (challenges, attempt ids, user handles).
pub(crate) fn random_base64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, accepting padded input.
pub fn decode_base64url(value: &str, field: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| malformed(&format!("{} is not valid base64url: {}", field, e)))
}

pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Parsed `clientDataJSON`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub ceremony_type: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default, rename = "crossOrigin")]
    pub cross_origin: bool,
}

impl ClientData {
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(raw)
            .map_err(|e| malformed(&format!("Invalid clientDataJSON: {}", e)))
    }

    /// Checks the ceremony type, challenge and origin, in that order.
    pub fn check(&self, ceremony_type: &str, challenge: &str, origin: &str) -> Result<(), Error> {
        if self.ceremony_type != ceremony_type {
            return Err(webauthn_error(
                WebAuthnErrorKind::UnexpectedType,
                &format!(
                    "Expected client data type {}, got {}",
                    ceremony_type, self.ceremony_type
                ),
            ));
        }
        if self.challenge.trim_end_matches('=') != challenge.trim_end_matches('=') {
            return Err(webauthn_error(
                WebAuthnErrorKind::ChallengeMismatch,
                "Challenge does not match the one issued for this attempt",
            ));
        }
        if self.origin.trim_end_matches('/') != origin.trim_end_matches('/') {
            return Err(webauthn_error(
                WebAuthnErrorKind::OriginMismatch,
                &format!("Unexpected origin {}", self.origin),
            ));
        }
        Ok(())
    }
}

/// Credential data attested during registration.
#[derive(Debug, Clone)]
pub struct AttestedCredential {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    /// CBOR-encoded COSE key, exactly as the authenticator produced it.
    pub public_key: Vec<u8>,
}

/// Parsed authenticator data.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredential>,
}

impl AuthenticatorData {
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < 37 {
            return Err(malformed("Authenticator data is too short"));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&raw[..32]);
        let flags = raw[32];
        let sign_count = u32::from_be_bytes([raw[33], raw[34], raw[35], raw[36]]);

        let attested_credential = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            Some(Self::parse_attested_credential(&raw[37..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }

    fn parse_attested_credential(raw: &[u8]) -> Result<AttestedCredential, Error> {
        if raw.len() < 18 {
            return Err(malformed("Attested credential data is too short"));
        }
        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&raw[..16]);
        let id_len = u16::from_be_bytes([raw[16], raw[17]]) as usize;
        let rest = &raw[18..];
        if rest.len() < id_len {
            return Err(malformed("Credential id runs past authenticator data"));
        }
        let credential_id = rest[..id_len].to_vec();

        // The COSE key is followed by optional extensions, so read exactly one CBOR item.
        let mut key_bytes = &rest[id_len..];
        let before = key_bytes.len();
        let _: Value = ciborium::from_reader(&mut key_bytes)
            .map_err(|e| malformed(&format!("Invalid credential public key: {}", e)))?;
        let consumed = before - key_bytes.len();

        Ok(AttestedCredential {
            aaguid,
            credential_id,
            public_key: rest[id_len..id_len + consumed].to_vec(),
        })
    }

    /// Checks the rp id hash against `rp_id`.
    pub fn check_rp_id(&self, rp_id: &str) -> Result<(), Error> {
        let expected: [u8; 32] = Sha256::digest(rp_id.as_bytes()).into();
        if self.rp_id_hash != expected {
            return Err(webauthn_error(
                WebAuthnErrorKind::RpIdMismatch,
                "Authenticator data was produced for a different relying party",
            ));
        }
        Ok(())
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }

    pub fn backup_eligible(&self) -> bool {
        self.flags & FLAG_BACKUP_ELIGIBLE != 0
    }

    pub fn backed_up(&self) -> bool {
        self.flags & FLAG_BACKED_UP != 0
    }
}

/// Extract `authData` from a CBOR attestation object.
///
/// Returns the attestation format alongside the raw authenticator data.
pub fn parse_attestation_object(raw: &[u8]) -> Result<(String, Vec<u8>), Error> {
    let value: Value = ciborium::from_reader(raw)
        .map_err(|e| malformed(&format!("Invalid attestation object: {}", e)))?;
    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(malformed("Attestation object is not a map")),
    };

    let mut fmt = None;
    let mut auth_data = None;
    for (key, value) in entries {
        match (key, value) {
            (Value::Text(key), Value::Text(value)) if key == "fmt" => fmt = Some(value),
            (Value::Text(key), Value::Bytes(value)) if key == "authData" => {
                auth_data = Some(value)
            }
            _ => {}
        }
    }

    match (fmt, auth_data) {
        (Some(fmt), Some(auth_data)) => Ok((fmt, auth_data)),
        _ => Err(malformed("Attestation object is missing fmt or authData")),
    }
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::Integer(i) => Some(i128::from(*i)),
        _ => None,
    }
}

/// Decode a CBOR COSE EC2 key into a P-256 verifying key.
///
/// Only ES256 keys are accepted.
pub fn verifying_key_from_cose(raw: &[u8]) -> Result<VerifyingKey, Error> {
    let value: Value = ciborium::from_reader(raw)
        .map_err(|e| malformed(&format!("Invalid COSE key: {}", e)))?;
    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(malformed("COSE key is not a map")),
    };

    let lookup = |label: i128| {
        entries
            .iter()
            .find(|(key, _)| integer(key) == Some(label))
            .map(|(_, value)| value)
    };

    let kty = lookup(COSE_KTY).and_then(integer);
    let alg = lookup(COSE_ALG).and_then(integer);
    let crv = lookup(COSE_EC2_CRV).and_then(integer);
    if kty != Some(COSE_KTY_EC2)
        || alg != Some(COSE_ALG_ES256 as i128)
        || crv != Some(COSE_CRV_P256)
    {
        return Err(webauthn_error(
            WebAuthnErrorKind::UnsupportedAlgorithm,
            "Only ES256 (P-256) credentials are supported",
        ));
    }

    let coordinate = |label: i128| match lookup(label) {
        Some(Value::Bytes(bytes)) if bytes.len() == 32 => Ok(bytes.as_slice()),
        _ => Err(malformed("COSE key coordinate must be 32 bytes")),
    };
    let x = coordinate(COSE_EC2_X)?;
    let y = coordinate(COSE_EC2_Y)?;

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| malformed(&format!("COSE key is not a valid P-256 point: {}", e)))
}

/// Verify an ES256 assertion signature over `authenticatorData || SHA-256(clientDataJSON)`.
pub fn verify_assertion_signature(
    key: &VerifyingKey,
    authenticator_data: &[u8],
    client_data_json: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let signature = Signature::from_der(signature).map_err(|_| {
        webauthn_error(
            WebAuthnErrorKind::InvalidSignature,
            "Signature is not DER encoded",
        )
    })?;

    let mut message = authenticator_data.to_vec();
    message.extend_from_slice(&Sha256::digest(client_data_json));

    key.verify(&message, &signature).map_err(|_| {
        webauthn_error(
            WebAuthnErrorKind::InvalidSignature,
            "Assertion signature verification failed",
        )
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for authenticator output, signed with a fixed P-256 key.

    use ciborium::value::Value;
    use p256::ecdsa::{signature::Signer, Signature, SigningKey};
    use sha2::{Digest, Sha256};

    use super::*;

    pub const RP_ID: &str = "localhost";
    pub const ORIGIN: &str = "http://localhost:3000";

    pub fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[7u8; 32]).unwrap()
    }

    pub fn cose_key(key: &SigningKey) -> Vec<u8> {
        let point = key.verifying_key().to_encoded_point(false);
        let map = Value::Map(vec![
            (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
            (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
            (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
            (
                Value::Integer((-2i64).into()),
                Value::Bytes(point.x().unwrap().to_vec()),
            ),
            (
                Value::Integer((-3i64).into()),
                Value::Bytes(point.y().unwrap().to_vec()),
            ),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&map, &mut out).unwrap();
        out
    }

    pub fn client_data(ceremony_type: &str, challenge: &str, origin: &str) -> Vec<u8> {
        serde_json::json!({
            "type": ceremony_type,
            "challenge": challenge,
            "origin": origin,
        })
        .to_string()
        .into_bytes()
    }

    pub fn authenticator_data(rp_id: &str, flags: u8, sign_count: u32) -> Vec<u8> {
        let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        data
    }

    pub fn attested_authenticator_data(
        rp_id: &str,
        flags: u8,
        credential_id: &[u8],
        cose_key: &[u8],
    ) -> Vec<u8> {
        let mut data = authenticator_data(rp_id, flags | 0x40, 0);
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(credential_id);
        data.extend_from_slice(cose_key);
        data
    }

    pub fn attestation_object(auth_data: Vec<u8>) -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
            (Value::Text("authData".into()), Value::Bytes(auth_data)),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&map, &mut out).unwrap();
        out
    }

    pub fn sign(key: &SigningKey, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut message = auth_data.to_vec();
        message.extend_from_slice(&Sha256::digest(client_data_json));
        let signature: Signature = key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }
}
