use crate::security::envelope::{canonical_json, SignedEnvelope};
use crate::security::nonce::NonceCache;
use crate::telemetry::logging;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Envelopes older or newer than this are rejected outright.
pub const MAX_TIMESTAMP_SKEW_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    MissingField(&'static str),
    StaleTimestamp { skew_ms: u64 },
    ReplayedNonce,
    BadSignature,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::MissingField(field) => write!(f, "missing field {field}"),
            VerifyError::StaleTimestamp { skew_ms } => {
                write!(f, "timestamp outside window, skew {skew_ms}ms")
            }
            VerifyError::ReplayedNonce => write!(f, "replayed nonce"),
            VerifyError::BadSignature => write!(f, "signature mismatch"),
        }
    }
}

/// Validates that an inbound envelope is complete, fresh, unreplayed and
/// carries a matching HMAC-SHA256 over canonical(data) ++ timestamp ++
/// nonce. The nonce is burned into the cache before the MAC comparison, so
/// a replay of a validly signed envelope is still rejected; the flip side,
/// an invalid signature permanently consuming its nonce, is the accepted
/// trade-off.
pub struct SignatureVerifier {
    secret: Vec<u8>,
    nonces: NonceCache,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, nonce_capacity: usize) -> Self {
        Self {
            secret: secret.into(),
            nonces: NonceCache::new(nonce_capacity),
        }
    }

    pub fn check(&self, envelope: &SignedEnvelope, now_ms: u64) -> Result<(), VerifyError> {
        let data = match envelope.data.as_ref() {
            Some(data) if !data.is_null() => data,
            _ => return Err(VerifyError::MissingField("data")),
        };
        let timestamp = envelope
            .timestamp
            .ok_or(VerifyError::MissingField("timestamp"))?;
        let nonce = match envelope.nonce.as_deref() {
            Some(nonce) if !nonce.is_empty() => nonce,
            _ => return Err(VerifyError::MissingField("nonce")),
        };
        let signature = match envelope.signature.as_deref() {
            Some(signature) if !signature.is_empty() => signature,
            _ => return Err(VerifyError::MissingField("signature")),
        };

        let skew_ms = now_ms.abs_diff(timestamp);
        if skew_ms > MAX_TIMESTAMP_SKEW_MS {
            return Err(VerifyError::StaleTimestamp { skew_ms });
        }

        // Burn the nonce before comparing signatures.
        if !self.nonces.insert_if_absent(nonce) {
            return Err(VerifyError::ReplayedNonce);
        }

        let signature = hex::decode(signature).map_err(|_| VerifyError::BadSignature)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| VerifyError::BadSignature)?;
        mac.update(Self::message(data, timestamp, nonce).as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VerifyError::BadSignature)
    }

    /// Boolean form used at the message boundary: failures are logged with
    /// actor context for audit and the envelope is dropped. The reason is
    /// never reflected back to the sender.
    pub fn verify(&self, actor: &str, envelope: &SignedEnvelope, now_ms: u64) -> bool {
        match self.check(envelope, now_ms) {
            Ok(()) => true,
            Err(err) => {
                logging::log_security(&format!(
                    "blocked envelope from {actor}: {err}, nonce={}, timestamp={}",
                    envelope.nonce.as_deref().unwrap_or("-"),
                    envelope
                        .timestamp
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ));
                false
            }
        }
    }

    /// Produce the hex signature for a payload; the counterpart of check().
    pub fn sign(&self, data: &Value, timestamp: u64, nonce: &str) -> String {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return String::new();
        };
        mac.update(Self::message(data, timestamp, nonce).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn message(data: &Value, timestamp: u64, nonce: &str) -> String {
        format!("{}{}{}", canonical_json(data), timestamp, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("test-secret", 64)
    }

    fn signed(verifier: &SignatureVerifier, data: Value, timestamp: u64, nonce: &str) -> SignedEnvelope {
        let signature = verifier.sign(&data, timestamp, nonce);
        SignedEnvelope {
            data: Some(data),
            timestamp: Some(timestamp),
            nonce: Some(nonce.to_string()),
            signature: Some(signature),
        }
    }

    #[test]
    fn valid_envelope_passes() {
        let verifier = verifier();
        let envelope = signed(&verifier, json!({"type": "activate-afk"}), NOW, "a1b2c3");
        assert_eq!(verifier.check(&envelope, NOW), Ok(()));
    }

    #[test]
    fn missing_fields_are_rejected_without_burning_the_nonce() {
        let verifier = verifier();
        let mut envelope = signed(&verifier, json!({"type": "move"}), NOW, "n0");
        envelope.signature = None;
        assert_eq!(
            verifier.check(&envelope, NOW),
            Err(VerifyError::MissingField("signature"))
        );
        // The nonce was not consumed by the incomplete envelope.
        let complete = signed(&verifier, json!({"type": "move"}), NOW, "n0");
        assert_eq!(verifier.check(&complete, NOW), Ok(()));
    }

    #[test]
    fn stale_timestamp_rejected_even_with_valid_signature() {
        let verifier = verifier();
        let envelope = signed(&verifier, json!({"type": "activate-afk"}), NOW - 5001, "n1");
        assert_eq!(
            verifier.check(&envelope, NOW),
            Err(VerifyError::StaleTimestamp { skew_ms: 5001 })
        );
        // Future skew is rejected symmetrically.
        let envelope = signed(&verifier, json!({"type": "activate-afk"}), NOW + 6000, "n2");
        assert!(matches!(
            verifier.check(&envelope, NOW),
            Err(VerifyError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn accepted_nonce_is_rejected_on_every_later_presentation() {
        let verifier = verifier();
        let first = signed(&verifier, json!({"type": "activate-afk"}), NOW, "shared");
        assert_eq!(verifier.check(&first, NOW), Ok(()));

        // Same nonce, different (validly signed) payload: still a replay.
        let second = signed(&verifier, json!({"type": "deactivate-afk"}), NOW, "shared");
        assert_eq!(verifier.check(&second, NOW), Err(VerifyError::ReplayedNonce));
    }

    #[test]
    fn invalid_signature_burns_its_nonce() {
        let verifier = verifier();
        let mut envelope = signed(&verifier, json!({"type": "activate-afk"}), NOW, "burned");
        envelope.signature = Some("00".repeat(32));
        assert_eq!(verifier.check(&envelope, NOW), Err(VerifyError::BadSignature));

        // A later, correctly signed envelope with the same nonce is refused.
        let valid = signed(&verifier, json!({"type": "activate-afk"}), NOW, "burned");
        assert_eq!(verifier.check(&valid, NOW), Err(VerifyError::ReplayedNonce));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let verifier = verifier();
        let mut envelope = signed(&verifier, json!({"type": "move", "x": 1.0}), NOW, "n9");
        envelope.data = Some(json!({"type": "move", "x": 999.0}));
        assert_eq!(verifier.check(&envelope, NOW), Err(VerifyError::BadSignature));
    }

    #[test]
    fn non_hex_signature_is_a_mismatch_not_a_panic() {
        let verifier = verifier();
        let mut envelope = signed(&verifier, json!({"type": "activate-afk"}), NOW, "nh");
        envelope.signature = Some("not-hex".to_string());
        assert_eq!(verifier.check(&envelope, NOW), Err(VerifyError::BadSignature));
    }
}
