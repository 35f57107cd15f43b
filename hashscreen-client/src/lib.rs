#![deny(missing_docs)]
//! Client orchestrator for privacy-preserving image screening.
//!
//! One image scan walks a fixed sequence of phases, each completing before
//! the next begins: hash the image, blind the hash, send the blinded point,
//! open the response envelope, verify the evaluation proof, unblind, match
//! against the verified database, and encrypt the outcome into the vault.
//! The server only ever sees the blinded point; the blinding factor is
//! client-local and wiped after unblinding, so abandoning a scan mid-flight
//! leaks nothing.
//!
//! Every cryptographic failure is terminal for the scan and is never
//! retried: a failed MAC or proof would fail identically on a retry, and
//! falling back to an unverified path would defeat the protocol. Scanning
//! refuses to start at all until the evaluated-hash database has been
//! verified in the current session, and the manifest is re-checked before
//! every scan so an expiry mid-session locks scanning down again.

use std::sync::Arc;

use hashscreen_core::curve::{self, CurveError, ProjectivePoint};
use hashscreen_core::dleq::DleqError;
use hashscreen_core::envelope::{EnvelopeError, EnvelopeKey};
use hashscreen_core::manifest::{DbManifest, ManifestError, ManifestKey};
use hashscreen_core::matcher::{self, BadDbEntry, DbEntry, MatchOutcome};
use hashscreen_core::oprf::client;
use hashscreen_core::phash::{self, PHash, PHashError};
use hashscreen_core::vault::{ResultVault, VaultError};
use hashscreen_types::api::v1::TextScanOutcome;
use hashscreen_types::KeyCommitment;
use parking_lot::Mutex;
use tracing::instrument;

mod db;
pub mod transport;

pub use transport::{EvalTransport, HttpTransport, TransportError};

use crate::db::VerifiedDatabase;

/// Errors surfaced by the scan orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The image could not be decoded; the scan fails without retry.
    #[error("scan failed: {0}")]
    Decode(#[from] PHashError),
    /// No database has been verified in the current session.
    #[error("refusing to scan: database not verified in this session")]
    DbUnverified,
    /// Database verification failed; scanning is locked down until the next
    /// successful verification.
    #[error("database verification failed: {0}")]
    Manifest(#[from] ManifestError),
    /// The database bytes are not a parseable entry list.
    #[error("database is not parseable: {0}")]
    BadDatabase(#[source] serde_json::Error),
    /// A database entry is not a valid point encoding.
    #[error(transparent)]
    BadEntry(#[from] BadDbEntry),
    /// The published key commitment is not a valid point.
    #[error("published key commitment is not a valid point: {0}")]
    BadCommitment(#[source] CurveError),
    /// The network request failed; surfaced generically.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Response integrity failed; the scan aborts.
    #[error("response integrity failed: {0}")]
    Integrity(#[from] EnvelopeError),
    /// The server's evaluation proof did not verify; the server is treated
    /// as potentially malicious and the scan aborts.
    #[error("server proof invalid: {0}")]
    Proof(#[from] DleqError),
    /// The result vault rejected the outcome.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Everything a [`ScanClient`] needs.
pub struct ScanClientArgs {
    /// Transport towards the screening server.
    pub transport: Arc<dyn EvalTransport>,
    /// Shared envelope MAC key.
    pub envelope_key: EnvelopeKey,
    /// The published commitment to the server's OPRF key.
    pub commitment: KeyCommitment,
    /// Key verifying the database manifest.
    pub manifest_key: ManifestKey,
    /// Vault receiving encrypted scan outcomes.
    pub vault: ResultVault,
    /// Maximum Hamming distance for a database match.
    pub match_threshold: u32,
}

/// The client-side protocol orchestrator.
pub struct ScanClient {
    transport: Arc<dyn EvalTransport>,
    envelope_key: EnvelopeKey,
    server_public_key: ProjectivePoint,
    manifest_key: ManifestKey,
    vault: ResultVault,
    match_threshold: u32,
    database: Mutex<Option<VerifiedDatabase>>,
}

impl ScanClient {
    /// Creates a client from its parts.
    ///
    /// Fails if the published key commitment does not decode to a curve
    /// point.
    pub fn new(args: ScanClientArgs) -> Result<Self, ScanError> {
        let server_public_key =
            curve::decode_point(&args.commitment.public_key).map_err(ScanError::BadCommitment)?;
        Ok(Self {
            transport: args.transport,
            envelope_key: args.envelope_key,
            server_public_key,
            manifest_key: args.manifest_key,
            vault: args.vault,
            match_threshold: args.match_threshold,
            database: Mutex::new(None),
        })
    }

    /// Verifies the evaluated-hash database against its manifest and admits
    /// it for matching.
    ///
    /// Must succeed once per session before any image scan. On failure any
    /// previously admitted database is discarded, locking scanning down.
    #[instrument(level = "debug", skip_all)]
    pub fn verify_database(
        &self,
        db_bytes: Vec<u8>,
        manifest: DbManifest,
    ) -> Result<(), ScanError> {
        let mut slot = self.database.lock();
        match VerifiedDatabase::verify(&self.manifest_key, db_bytes, manifest) {
            Ok(database) => {
                tracing::debug!("database admitted with {} entries", database.entries().len());
                *slot = Some(database);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("database verification failed: {err}");
                *slot = None;
                Err(err)
            }
        }
    }

    /// Scans an image end-to-end and stores the encrypted outcome under
    /// `scan_id`.
    #[instrument(level = "debug", skip_all, fields(scan_id = scan_id))]
    pub async fn scan_image(
        &self,
        image_bytes: &[u8],
        scan_id: &str,
    ) -> Result<MatchOutcome, ScanError> {
        // Pre-condition for hashing: a database verified in this session.
        if self.database.lock().is_none() {
            return Err(ScanError::DbUnverified);
        }
        let phash = phash::phash(image_bytes)?;
        tracing::debug!("image hashed to {phash}");
        self.scan_phash(phash, scan_id).await
    }

    /// Runs the scan pipeline from an already-computed perceptual hash.
    #[instrument(level = "debug", skip_all, fields(scan_id = scan_id))]
    pub async fn scan_phash(
        &self,
        phash: PHash,
        scan_id: &str,
    ) -> Result<MatchOutcome, ScanError> {
        let entries = self.checked_entries()?;

        let (blinded, factor) = client::blind(&phash, &mut rand::thread_rng());
        tracing::debug!("sending blinded query..");
        let envelope = self.transport.evaluate(&blinded.to_hex()).await?;

        tracing::debug!("opening response envelope..");
        let payload = self.envelope_key.open(envelope)?;

        tracing::debug!("verifying evaluation proof..");
        payload
            .proof
            .verify(&self.server_public_key, &blinded, &payload.evaluated_point)?;

        let token = client::unblind(payload.evaluated_point, factor);
        let outcome = matcher::find_match(&token, &entries, self.match_threshold)?;
        tracing::debug!("match outcome: {outcome:?}");

        self.vault.store(scan_id, &outcome)?;
        Ok(outcome)
    }

    /// Scans a text through the server-side keyword filter.
    #[instrument(level = "debug", skip_all)]
    pub async fn scan_text(&self, text: &str) -> Result<TextScanOutcome, ScanError> {
        let envelope = self.transport.scan_text(text).await?;
        Ok(self.envelope_key.open(envelope)?)
    }

    /// Loads a previously stored scan outcome from the vault.
    pub fn load_result(&self, scan_id: &str) -> Result<Option<MatchOutcome>, ScanError> {
        Ok(self.vault.load(scan_id)?)
    }

    /// Removes every stored outcome and wipes the session key.
    pub fn clear_results(&self) {
        self.vault.clear_all();
    }

    /// Snapshots the admitted database after re-verifying its manifest.
    ///
    /// A database that stops verifying (e.g. its manifest expired
    /// mid-session) is dropped, and scanning refuses until the next
    /// successful [`ScanClient::verify_database`].
    fn checked_entries(&self) -> Result<Vec<DbEntry>, ScanError> {
        let mut slot = self.database.lock();
        let database = slot.as_ref().ok_or(ScanError::DbUnverified)?;
        if let Err(err) = database.reverify(&self.manifest_key) {
            tracing::warn!("database stopped verifying: {err}");
            *slot = None;
            return Err(err.into());
        }
        Ok(database.entries().to_vec())
    }
}
