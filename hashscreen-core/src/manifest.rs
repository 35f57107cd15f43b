//! Signed descriptors for the evaluated-hash database.
//!
//! A manifest binds the database bytes, a generation timestamp and a version
//! string under a single keyed tag. Clients re-verify at startup and before
//! each scan; any byte of drift in the database, and any manifest older than
//! the rollback window, locks scanning down until verification succeeds
//! again.

use hmac::{Hmac, Mac as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::time::epoch_ms;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted manifest age: 30 days. Bounds rollback attacks.
pub const MAX_AGE_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// The signed descriptor stored alongside the database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbManifest {
    /// SHA-256 of the database bytes, 64 lowercase hex characters.
    pub hash: String,
    /// HMAC-SHA-256 over `hash:timestamp:version`, 64 lowercase hex
    /// characters.
    pub signature: String,
    /// Milliseconds since the Unix epoch at generation time.
    pub timestamp: u64,
    /// Version label of the database release.
    pub version: String,
}

/// Reasons manifest verification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// The database bytes do not hash to the manifest's content hash.
    #[error("database content hash mismatch")]
    HashMismatch,
    /// The keyed signature over the manifest fields does not verify.
    #[error("database signature mismatch")]
    SigMismatch,
    /// The manifest is older than the rollback window.
    #[error("database manifest expired")]
    Expired,
}

/// The HMAC key used to sign and verify manifests.
#[derive(Clone)]
pub struct ManifestKey(Vec<u8>);

impl ManifestKey {
    /// Builds a key from the signing secret bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    /// Signs database bytes, producing the manifest for publication.
    pub fn sign(&self, db_bytes: &[u8], version: &str) -> DbManifest {
        self.sign_at(db_bytes, version, epoch_ms())
    }

    /// Signs database bytes with an explicit timestamp.
    pub fn sign_at(&self, db_bytes: &[u8], version: &str, timestamp: u64) -> DbManifest {
        let hash = hex::encode(Sha256::digest(db_bytes));
        let signature = self.tag(&hash, timestamp, version);
        DbManifest {
            hash,
            signature,
            timestamp,
            version: version.to_owned(),
        }
    }

    /// Verifies database bytes against a manifest at the current time.
    pub fn verify(&self, db_bytes: &[u8], manifest: &DbManifest) -> Result<(), ManifestError> {
        self.verify_at(db_bytes, manifest, epoch_ms())
    }

    /// Verifies against an explicit clock reading.
    ///
    /// Checks content hash, then signature (constant-time), then age; only
    /// after all three may the database be admitted to matching.
    pub fn verify_at(
        &self,
        db_bytes: &[u8],
        manifest: &DbManifest,
        now_ms: u64,
    ) -> Result<(), ManifestError> {
        let hash = hex::encode(Sha256::digest(db_bytes));
        if hash != manifest.hash {
            return Err(ManifestError::HashMismatch);
        }
        let expected = self.tag(&manifest.hash, manifest.timestamp, &manifest.version);
        if expected
            .as_bytes()
            .ct_eq(manifest.signature.as_bytes())
            .unwrap_u8()
            != 1
        {
            return Err(ManifestError::SigMismatch);
        }
        if now_ms.saturating_sub(manifest.timestamp) > MAX_AGE_MS {
            return Err(ManifestError::Expired);
        }
        Ok(())
    }

    fn tag(&self, hash: &str, timestamp: u64, version: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(hash.as_bytes());
        mac.update(b":");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b":");
        mac.update(version.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
