//! The verified evaluated-hash database held by the client.

use hashscreen_core::manifest::{DbManifest, ManifestError, ManifestKey};
use hashscreen_core::matcher::DbEntry;

/// A database that passed manifest verification in this session.
///
/// The raw bytes and manifest are retained so verification can be repeated
/// before every scan; the parsed entries feed the match engine.
pub(crate) struct VerifiedDatabase {
    db_bytes: Vec<u8>,
    manifest: DbManifest,
    entries: Vec<DbEntry>,
}

impl VerifiedDatabase {
    /// Verifies the manifest over the raw bytes and parses the entries.
    pub(crate) fn verify(
        manifest_key: &ManifestKey,
        db_bytes: Vec<u8>,
        manifest: DbManifest,
    ) -> Result<Self, crate::ScanError> {
        manifest_key.verify(&db_bytes, &manifest)?;
        let entries: Vec<DbEntry> =
            serde_json::from_slice(&db_bytes).map_err(crate::ScanError::BadDatabase)?;
        Ok(Self {
            db_bytes,
            manifest,
            entries,
        })
    }

    /// Repeats manifest verification, catching expiry mid-session.
    pub(crate) fn reverify(&self, manifest_key: &ManifestKey) -> Result<(), ManifestError> {
        manifest_key.verify(&self.db_bytes, &self.manifest)
    }

    /// The parsed database entries in file order.
    pub(crate) fn entries(&self) -> &[DbEntry] {
        &self.entries
    }
}
