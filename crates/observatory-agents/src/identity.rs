//! Cryptographic identity and request authentication.
//!
//! Two authenticated flows exist. Registration proves key possession (a
//! signed nonce) and burns work (a hash puzzle); action requests sign the
//! canonical message `METHOD:PATH:BODY:TIMESTAMP` with the registered key.
//!
//! Ed25519 is the preferred scheme: a public key that hex-decodes to a
//! valid 32-byte verifying key must present valid Ed25519 signatures.
//! Any other key string falls back to HMAC-SHA256 with the key as shared
//! secret -- not cryptographically equivalent, kept so local development
//! and tests run without asymmetric keys; disable for production.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use observatory_types::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Required leading zero bits of `SHA-256(challenge || nonce)`.
pub const POW_DIFFICULTY_BITS: u32 = 16;

/// Maximum accepted clock skew for `X-Timestamp`, in seconds.
pub const TIMESTAMP_MAX_SKEW_SECONDS: f64 = 300.0;

/// Claim token lifetime, in seconds (24 hours).
pub const CLAIM_TOKEN_TTL_SECONDS: f64 = 86_400.0;

/// Generate a random 128-bit proof-of-work challenge, hex-encoded.
pub fn generate_challenge() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate a single-use claim token: 32 random bytes, URL-safe base64
/// without padding (at least 256 bits of entropy).
pub fn generate_claim_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the deterministic agent id from a public key:
/// `agent_` + the first 16 hex chars of SHA-256(public key).
pub fn derive_agent_id(public_key: &str) -> String {
    let digest = Sha256::digest(public_key.as_bytes());
    let hex_digest = hex::encode(digest);
    let prefix: String = hex_digest.chars().take(16).collect();
    format!("agent_{prefix}")
}

/// Verify a proof-of-work solution: the digest of `challenge || nonce`
/// must start with [`POW_DIFFICULTY_BITS`] zero bits (4 hex zeros).
pub fn verify_pow(challenge: &str, pow_nonce: &str) -> bool {
    let digest = Sha256::digest(format!("{challenge}{pow_nonce}").as_bytes());
    let hex_digest = hex::encode(digest);
    let required_zeros = (POW_DIFFICULTY_BITS / 4) as usize;
    hex_digest.chars().take(required_zeros).all(|c| c == '0')
}

/// Brute-force a proof-of-work solution (client-side utility, used by
/// tests and reference agents).
pub fn solve_pow(challenge: &str) -> String {
    let mut nonce: u64 = 0;
    loop {
        let candidate = nonce.to_string();
        if verify_pow(challenge, &candidate) {
            return candidate;
        }
        nonce = nonce.saturating_add(1);
    }
}

/// Verify that the registrant controls the private counterpart of
/// `public_key` by checking the signature over the raw nonce.
pub fn verify_signed_nonce(public_key: &str, nonce: &str, signature: &str) -> bool {
    verify_signature(public_key, nonce.as_bytes(), signature)
}

/// Verify a signed agent API request over the canonical message
/// `METHOD:PATH:BODY:TIMESTAMP`.
pub fn verify_request(
    public_key: &str,
    method: &str,
    path: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
) -> bool {
    let message = format!("{method}:{path}:{body}:{timestamp}");
    verify_signature(public_key, message.as_bytes(), signature)
}

/// Whether a request timestamp (unix seconds) is within the skew bound
/// of the current wall clock.
pub fn is_timestamp_valid(timestamp: &str) -> bool {
    timestamp_within_skew(timestamp, unix_now())
}

/// Skew check against an explicit `now` (separated for deterministic
/// tests).
pub fn timestamp_within_skew(timestamp: &str, now: f64) -> bool {
    timestamp
        .trim()
        .parse::<f64>()
        .is_ok_and(|ts| ts.is_finite() && (now - ts).abs() < TIMESTAMP_MAX_SKEW_SECONDS)
}

/// Compute the HMAC-SHA256 fallback signature for a message, hex-encoded.
///
/// This is the client half of the fallback scheme; the server only ever
/// verifies. Exposed for tests and reference agents.
pub fn hmac_sign(public_key: &str, message: &str) -> String {
    HmacSha256::new_from_slice(public_key.as_bytes()).map_or_else(
        |_| String::new(),
        |mut mac| {
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        },
    )
}

/// Signature verification with the Ed25519-preferred policy.
fn verify_signature(public_key: &str, message: &[u8], signature: &str) -> bool {
    if let Some(key) = parse_ed25519_key(public_key) {
        let Ok(sig_bytes) = hex::decode(signature) else {
            return false;
        };
        let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        let sig = Signature::from_bytes(&sig_array);
        return key.verify(message, &sig).is_ok();
    }

    // HMAC fallback: the public key string is the shared secret.
    // Constant-time comparison via `Mac::verify_slice`.
    let Ok(sig_bytes) = hex::decode(signature) else {
        return false;
    };
    HmacSha256::new_from_slice(public_key.as_bytes()).is_ok_and(|mut mac| {
        mac.update(message);
        mac.verify_slice(&sig_bytes).is_ok()
    })
}

/// Parse a hex-encoded 32-byte Ed25519 verifying key, if that is what the
/// string is.
fn parse_ed25519_key(public_key: &str) -> Option<VerifyingKey> {
    let bytes = hex::decode(public_key).ok()?;
    let array = <[u8; 32]>::try_from(bytes.as_slice()).ok()?;
    VerifyingKey::from_bytes(&array).ok()
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    #[test]
    fn agent_id_is_deterministic_and_prefixed() {
        let id = derive_agent_id("pk001");
        assert!(id.starts_with("agent_"));
        assert_eq!(id.len(), "agent_".len() + 16);
        assert_eq!(id, derive_agent_id("pk001"));
        assert_ne!(id, derive_agent_id("pk002"));
    }

    #[test]
    fn pow_solution_verifies_and_garbage_does_not() {
        let challenge = "abc123";
        let nonce = solve_pow(challenge);
        assert!(verify_pow(challenge, &nonce));
        assert!(!verify_pow(challenge, "not-a-solution"));
        // A solution is bound to its challenge.
        assert!(!verify_pow("different", &nonce) || solve_pow("different") != nonce);
    }

    #[test]
    fn hmac_fallback_roundtrip() {
        let key = "pk001";
        let nonce = "n1";
        let signature = hmac_sign(key, nonce);
        assert!(verify_signed_nonce(key, nonce, &signature));
        assert!(!verify_signed_nonce(key, "n2", &signature));
        assert!(!verify_signed_nonce("pk002", nonce, &signature));
        assert!(!verify_signed_nonce(key, nonce, "deadbeef"));
    }

    #[test]
    fn hmac_request_signature_covers_every_component() {
        let key = "pk001";
        let message = "POST:/agent/action:{\"action_type\":\"move\"}:1700000000";
        let signature = hmac_sign(key, message);
        assert!(verify_request(
            key,
            "POST",
            "/agent/action",
            "{\"action_type\":\"move\"}",
            "1700000000",
            &signature,
        ));
        // Any altered component invalidates the signature.
        assert!(!verify_request(
            key,
            "GET",
            "/agent/action",
            "{\"action_type\":\"move\"}",
            "1700000000",
            &signature,
        ));
        assert!(!verify_request(
            key,
            "POST",
            "/agent/observe",
            "{\"action_type\":\"move\"}",
            "1700000000",
            &signature,
        ));
    }

    #[test]
    fn ed25519_signatures_verify() {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let public_key = hex::encode(signing.verifying_key().to_bytes());

        let message = "POST:/agent/observe::1700000000";
        let signature = hex::encode(signing.sign(message.as_bytes()).to_bytes());
        assert!(verify_request(
            &public_key,
            "POST",
            "/agent/observe",
            "",
            "1700000000",
            &signature,
        ));
        // A valid Ed25519 key never falls back to HMAC.
        let forged = hmac_sign(&public_key, message);
        assert!(!verify_request(
            &public_key,
            "POST",
            "/agent/observe",
            "",
            "1700000000",
            &forged,
        ));
    }

    #[test]
    fn ed25519_rejects_tampered_message() {
        let signing = SigningKey::from_bytes(&[9u8; 32]);
        let public_key = hex::encode(signing.verifying_key().to_bytes());
        let signature = hex::encode(signing.sign(b"nonce-a").to_bytes());
        assert!(verify_signed_nonce(&public_key, "nonce-a", &signature));
        assert!(!verify_signed_nonce(&public_key, "nonce-b", &signature));
    }

    #[test]
    fn timestamp_skew_bound_is_300_seconds() {
        let now = 1_700_000_000.0;
        assert!(timestamp_within_skew("1700000000", now));
        assert!(timestamp_within_skew("1699999800", now));
        assert!(!timestamp_within_skew("1699999699", now));
        assert!(!timestamp_within_skew("1700000301", now));
        assert!(!timestamp_within_skew("yesterday", now));
        assert!(!timestamp_within_skew("", now));
    }

    #[test]
    fn claim_tokens_are_long_and_unique() {
        let a = generate_claim_token();
        let b = generate_claim_token();
        assert_ne!(a, b);
        // 32 bytes in unpadded base64 is 43 chars.
        assert_eq!(a.len(), 43);
        assert!(!a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn challenges_are_128_bit_hex() {
        let challenge = generate_challenge();
        assert_eq!(challenge.len(), 32);
        assert!(challenge.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
