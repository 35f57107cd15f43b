//! Keyed-MAC integrity and freshness wrapper over protocol responses.
//!
//! Every server response travels inside an [`Envelope`]: the payload, a
//! random nonce, an epoch-millisecond timestamp and an HMAC-SHA-256 tag over
//! the canonical JSON of the payload joined with nonce and timestamp. The
//! receiver rejects stale and far-future envelopes before checking the tag.
//!
//! The MAC secret is shared between the server and client code running on a
//! trusted path. Where the client is untrusted browser code reaching the
//! server over TLS, the secret stays server-side and is mirrored through a
//! trusted distribution channel; the envelope then authenticates message
//! integrity end-to-end but not the client itself.

use hmac::{Hmac, Mac as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::canonical;
use crate::time::epoch_ms;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted envelope age.
pub const MAX_AGE_MS: u64 = 300_000;

/// Maximum accepted clock skew into the future.
pub const FUTURE_SLACK_MS: u64 = 60_000;

const NONCE_LEN: usize = 16;

/// A payload wrapped with a keyed MAC, nonce and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The wrapped payload.
    pub data: T,
    /// HMAC-SHA-256 tag, 64 lowercase hex characters.
    pub mac: String,
    /// Random nonce, 32 lowercase hex characters.
    pub nonce: String,
    /// Milliseconds since the Unix epoch at wrapping time.
    pub timestamp: u64,
}

/// Reasons an [`Envelope`] fails to open.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope is older than [`MAX_AGE_MS`].
    #[error("envelope is stale")]
    Stale,
    /// The envelope timestamp is more than [`FUTURE_SLACK_MS`] ahead.
    #[error("envelope timestamp lies in the future")]
    Future,
    /// The MAC does not match the payload.
    #[error("envelope MAC mismatch")]
    MacMismatch,
    /// The payload could not be rendered as canonical JSON.
    #[error("cannot canonicalize payload: {0}")]
    Canonical(#[from] serde_json::Error),
}

/// The shared HMAC key for wrapping and opening envelopes.
#[derive(Clone)]
pub struct EnvelopeKey(Vec<u8>);

impl EnvelopeKey {
    /// Builds a key from the shared secret bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    /// Wraps a payload with a fresh nonce and the current time.
    pub fn wrap<T: Serialize>(&self, data: T) -> Result<Envelope<T>, EnvelopeError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let timestamp = epoch_ms();
        let mac = self.tag(&data, &nonce, timestamp)?;
        Ok(Envelope {
            data,
            mac,
            nonce,
            timestamp,
        })
    }

    /// Opens an envelope, checking freshness and the MAC against the
    /// current time.
    pub fn open<T: Serialize>(&self, envelope: Envelope<T>) -> Result<T, EnvelopeError> {
        self.open_at(envelope, epoch_ms())
    }

    /// Opens an envelope against an explicit clock reading.
    ///
    /// Freshness is checked before the MAC; the MAC comparison is
    /// constant-time. All failures are terminal for the request.
    pub fn open_at<T: Serialize>(
        &self,
        envelope: Envelope<T>,
        now_ms: u64,
    ) -> Result<T, EnvelopeError> {
        if now_ms.saturating_sub(envelope.timestamp) > MAX_AGE_MS {
            return Err(EnvelopeError::Stale);
        }
        if envelope.timestamp.saturating_sub(now_ms) > FUTURE_SLACK_MS {
            return Err(EnvelopeError::Future);
        }
        let expected = self.tag(&envelope.data, &envelope.nonce, envelope.timestamp)?;
        if expected.as_bytes().ct_eq(envelope.mac.as_bytes()).unwrap_u8() != 1 {
            return Err(EnvelopeError::MacMismatch);
        }
        Ok(envelope.data)
    }

    /// The MAC over `canonical(data) :: nonce :: timestamp`.
    fn tag<T: Serialize>(
        &self,
        data: &T,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, EnvelopeError> {
        let payload = canonical::to_string(data)?;
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac.update(b"::");
        mac.update(nonce.as_bytes());
        mac.update(b"::");
        mac.update(timestamp.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        status: String,
        count: u32,
    }

    fn payload() -> Payload {
        Payload {
            status: "safe".to_owned(),
            count: 3,
        }
    }

    fn key() -> EnvelopeKey {
        EnvelopeKey::new("test-mac-secret")
    }

    #[test]
    fn wrap_open_roundtrip() {
        let env = key().wrap(payload()).unwrap();
        assert_eq!(env.nonce.len(), 2 * NONCE_LEN);
        assert_eq!(env.mac.len(), 64);
        assert_eq!(key().open(env).unwrap(), payload());
    }

    #[test]
    fn tampered_data_is_rejected() {
        let mut env = key().wrap(payload()).unwrap();
        env.data.count += 1;
        assert!(matches!(
            key().open(env),
            Err(EnvelopeError::MacMismatch)
        ));
    }

    #[test]
    fn tampered_nonce_timestamp_and_mac_are_rejected() {
        let env = key().wrap(payload()).unwrap();

        let mut bad_nonce = env.clone();
        let flipped = if env.nonce.starts_with('0') { "1" } else { "0" };
        bad_nonce.nonce.replace_range(0..1, flipped);
        assert!(matches!(
            key().open(bad_nonce),
            Err(EnvelopeError::MacMismatch)
        ));

        let mut bad_ts = env.clone();
        bad_ts.timestamp += 1;
        assert!(matches!(key().open(bad_ts), Err(EnvelopeError::MacMismatch)));

        let mut bad_mac = env.clone();
        let last = bad_mac.mac.pop().unwrap();
        bad_mac.mac.push(if last == '0' { '1' } else { '0' });
        assert!(matches!(key().open(bad_mac), Err(EnvelopeError::MacMismatch)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let env = key().wrap(payload()).unwrap();
        assert!(matches!(
            EnvelopeKey::new("other-secret").open(env),
            Err(EnvelopeError::MacMismatch)
        ));
    }

    #[test]
    fn freshness_boundaries() {
        let env = key().wrap(payload()).unwrap();
        let ts = env.timestamp;

        // Exactly at the age limit: accepted.
        key().open_at(env.clone(), ts + MAX_AGE_MS).unwrap();
        assert!(matches!(
            key().open_at(env.clone(), ts + MAX_AGE_MS + 1),
            Err(EnvelopeError::Stale)
        ));

        // Exactly at the future tolerance: accepted.
        key().open_at(env.clone(), ts - FUTURE_SLACK_MS).unwrap();
        assert!(matches!(
            key().open_at(env, ts - FUTURE_SLACK_MS - 1),
            Err(EnvelopeError::Future)
        ));
    }

    #[test]
    fn nonces_are_fresh() {
        let a = key().wrap(payload()).unwrap();
        let b = key().wrap(payload()).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }
}
