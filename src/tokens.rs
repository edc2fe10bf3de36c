//! Stateless approval tokens.
//!
//! A token is the URL-safe base64 encoding of `payload || "." || signature`
//! where payload is the compact JSON serialization of the claims (with an
//! absolute `exp` epoch-seconds field injected at mint time) and signature is
//! HMAC-SHA256 over those exact payload bytes. No server-side session backs a
//! token; a compromised signing key requires rotation, which invalidates all
//! outstanding tokens. TTLs are short, so that is an acceptable blast radius.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: u8 = b'.';
const SIG_LEN: usize = 32;

/// Mints and verifies signed, expiring approval tokens.
#[derive(Clone)]
pub struct TokenCodec {
    key: Vec<u8>,
}

impl TokenCodec {
    pub fn new(signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: signing_key.into(),
        }
    }

    /// Signs `payload` with an injected `exp` field set to now + ttl.
    /// Pure computation, no side effects.
    pub fn mint(&self, payload: &Map<String, Value>, ttl: Duration) -> String {
        let mut claims = payload.clone();
        claims.insert(
            "exp".to_string(),
            Value::from((Utc::now() + ttl).timestamp()),
        );
        // Map serialization is infallible for scalar values.
        let raw = serde_json::to_vec(&Value::Object(claims)).unwrap_or_default();
        let sig = self.sign(&raw);

        let mut blob = raw;
        blob.push(SEPARATOR);
        blob.extend_from_slice(&sig);
        URL_SAFE.encode(blob)
    }

    /// Decodes and authenticates a token. Every failure mode -- bad encoding,
    /// malformed structure, signature mismatch, reached expiry -- collapses to
    /// `None`; the caller maps that to a single client-facing error.
    pub fn verify(&self, token: &str) -> Option<Map<String, Value>> {
        let blob = URL_SAFE.decode(token.as_bytes()).ok()?;
        let (raw, sig) = split_payload_and_signature(&blob)?;

        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(raw);
        // Constant-time comparison.
        mac.verify_slice(sig).ok()?;

        let value: Value = serde_json::from_slice(raw).ok()?;
        let claims = match value {
            Value::Object(map) => map,
            _ => return None,
        };
        let exp = claims.get("exp").and_then(Value::as_i64).unwrap_or(0);
        if exp <= Utc::now().timestamp() {
            return None;
        }
        Some(claims)
    }

    /// The raw signature bytes of a token, without authenticating it. Used to
    /// content-address tokens in the single-use guard.
    pub fn signature_bytes(token: &str) -> Option<Vec<u8>> {
        let blob = URL_SAFE.decode(token.as_bytes()).ok()?;
        let (_, sig) = split_payload_and_signature(&blob)?;
        Some(sig.to_vec())
    }

    fn sign(&self, raw: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(raw);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Splits a decoded blob into payload and signature. The signature length is
/// fixed, so the split position is known even when the raw signature bytes
/// happen to contain the separator value.
fn split_payload_and_signature(blob: &[u8]) -> Option<(&[u8], &[u8])> {
    if blob.len() < SIG_LEN + 2 {
        return None;
    }
    let sep = blob.len() - SIG_LEN - 1;
    if blob[sep] != SEPARATOR {
        return None;
    }
    Some((&blob[..sep], &blob[sep + 1..]))
}
