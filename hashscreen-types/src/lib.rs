#![deny(missing_docs)]
//! Wire types shared between the screening client and service.
//!
//! This crate groups the request/response payloads exchanged over the two
//! scan endpoints and the static artifacts published next to them, with
//! serde (de)serialization pinned to the exact JSON field names of the wire
//! contract. Cryptographic payload types ([`hashscreen_core::dleq::DleqProof`],
//! [`hashscreen_core::oprf::EvaluatedQuery`], envelopes) come from the core
//! crate and are composed here.

use serde::{Deserialize, Serialize};

pub mod api;

/// Path of the published server key commitment.
pub const KEY_COMMITMENT_PATH: &str = "/server_key_commitment.json";

/// Path of the evaluated-hash database.
pub const DATABASE_PATH: &str = "/eHashes/evaluated_phashes.json";

/// Path of the database manifest.
pub const DATABASE_MANIFEST_PATH: &str = "/eHashes/database_signature.json";

/// Outcome of a keyword scan over user text.
///
/// A blocking keyword wins over a warning keyword; both carry the reason and
/// the keyword that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    /// No keyword matched.
    Safe,
    /// A warning-list keyword matched.
    Warning {
        /// Human-readable explanation.
        reason: String,
        /// The keyword that matched.
        keyword: String,
    },
    /// A blocking-list keyword matched.
    Blocked {
        /// Human-readable explanation.
        reason: String,
        /// The keyword that matched.
        keyword: String,
    },
}

/// The published commitment `K = k·G` to the server's OPRF key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCommitment {
    /// Compressed-SEC1 hex of the public key point.
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Milliseconds since the Unix epoch at publication time.
    pub timestamp: u64,
    /// Version label of the key release.
    pub version: String,
}
