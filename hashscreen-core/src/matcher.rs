//! Membership testing of unblinded tokens against the evaluated-hash
//! database.
//!
//! Distance is the bit-level Hamming distance between the 33-byte compressed
//! point encodings of the client's token and each database entry. This is a
//! domain-specific heuristic, not a metric-preserving operation: under a
//! hash-to-curve modeled as a random oracle, nearby perceptual hashes do not
//! map to nearby token encodings, so only the exact-match case (distance 0)
//! carries the full matching signal. The policy is nevertheless part of the
//! system's observable contract and is preserved as-is.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::curve::COMPRESSED_POINT_LEN;
use crate::oprf::Token;

/// Default maximum Hamming distance for a match.
pub const DEFAULT_THRESHOLD: u32 = 10;

/// One database entry: an opaque file identifier and the server-evaluated
/// token `k·H(p)` of a known-bad perceptual hash `p`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbEntry {
    /// Opaque identifier of the flagged file.
    pub file: String,
    /// Compressed-SEC1 hex of the evaluated token.
    pub phash: String,
}

/// Error raised when a database entry is not a valid point encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("database entry {file:?} is not a compressed point encoding")]
pub struct BadDbEntry {
    /// The file identifier of the malformed entry.
    pub file: String,
}

/// Outcome of a membership test.
///
/// On the wire this renders as `{"matched": bool, "distance"?, "file"?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A database entry lies within the distance threshold.
    Matched {
        /// File identifier of the matching entry.
        file: String,
        /// Hamming distance to that entry.
        distance: u32,
    },
    /// No entry lies within the threshold.
    NoMatch,
}

impl MatchOutcome {
    /// Returns `true` for [`MatchOutcome::Matched`].
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// Tests a token against the database.
///
/// Returns the first entry in database order with Hamming distance at most
/// `threshold`; a threshold of 0 therefore matches only byte-identical
/// tokens. Fails if an entry cannot be decoded.
pub fn find_match(
    token: &Token,
    db: &[DbEntry],
    threshold: u32,
) -> Result<MatchOutcome, BadDbEntry> {
    let token_bytes = token.to_bytes();
    for entry in db {
        let entry_bytes = hex::decode(&entry.phash).map_err(|_| BadDbEntry {
            file: entry.file.clone(),
        })?;
        if entry_bytes.len() != COMPRESSED_POINT_LEN {
            return Err(BadDbEntry {
                file: entry.file.clone(),
            });
        }
        let distance: u32 = token_bytes
            .iter()
            .zip(&entry_bytes)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        if distance <= threshold {
            return Ok(MatchOutcome::Matched {
                file: entry.file.clone(),
                distance,
            });
        }
    }
    Ok(MatchOutcome::NoMatch)
}

impl Serialize for MatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MatchOutcome::Matched { file, distance } => {
                let mut state = serializer.serialize_struct("MatchOutcome", 3)?;
                state.serialize_field("matched", &true)?;
                state.serialize_field("distance", distance)?;
                state.serialize_field("file", file)?;
                state.end()
            }
            MatchOutcome::NoMatch => {
                let mut state = serializer.serialize_struct("MatchOutcome", 1)?;
                state.serialize_field("matched", &false)?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for MatchOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            matched: bool,
            distance: Option<u32>,
            file: Option<String>,
        }
        let wire = Wire::deserialize(deserializer)?;
        if wire.matched {
            match (wire.file, wire.distance) {
                (Some(file), Some(distance)) => Ok(MatchOutcome::Matched { file, distance }),
                _ => Err(serde::de::Error::custom(
                    "matched outcome requires file and distance",
                )),
            }
        } else {
            Ok(MatchOutcome::NoMatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::oprf::server::OprfKey;
    use crate::phash::PHash;

    use super::*;

    fn token_for(key: &OprfKey, phash: &str) -> Token {
        key.evaluate_unblinded(&phash.parse::<PHash>().unwrap())
    }

    fn db(key: &OprfKey) -> Vec<DbEntry> {
        vec![
            DbEntry {
                file: "img-001".to_owned(),
                phash: token_for(key, "fffefcf8f0e0c080").to_hex(),
            },
            DbEntry {
                file: "img-002".to_owned(),
                phash: token_for(key, "00000000deadbeef").to_hex(),
            },
        ]
    }

    #[test]
    fn exact_token_matches_at_distance_zero() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let outcome = find_match(
            &token_for(&key, "fffefcf8f0e0c080"),
            &db(&key),
            DEFAULT_THRESHOLD,
        )
        .unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                file: "img-001".to_owned(),
                distance: 0
            }
        );
    }

    #[test]
    fn absent_token_does_not_match() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let outcome = find_match(
            &token_for(&key, "0123456789abcdef"),
            &db(&key),
            DEFAULT_THRESHOLD,
        )
        .unwrap();
        assert_eq!(outcome, MatchOutcome::NoMatch);
    }

    #[test]
    fn threshold_zero_requires_exact_equality() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let exact = find_match(&token_for(&key, "00000000deadbeef"), &db(&key), 0).unwrap();
        assert!(exact.is_match());
        let near_input = find_match(&token_for(&key, "00000000deadbeee"), &db(&key), 0).unwrap();
        assert_eq!(near_input, MatchOutcome::NoMatch);
    }

    #[test]
    fn first_entry_in_db_order_wins() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let token = token_for(&key, "fffefcf8f0e0c080");
        let mut entries = db(&key);
        entries.insert(
            0,
            DbEntry {
                file: "img-000".to_owned(),
                phash: token.to_hex(),
            },
        );
        let outcome = find_match(&token, &entries, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                file: "img-000".to_owned(),
                distance: 0
            }
        );
    }

    #[test]
    fn malformed_entry_is_an_error() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let entries = vec![DbEntry {
            file: "broken".to_owned(),
            phash: "zz".to_owned(),
        }];
        let err = find_match(&token_for(&key, "fffefcf8f0e0c080"), &entries, 0).unwrap_err();
        assert_eq!(err.file, "broken");
    }

    #[test]
    fn wire_shape() {
        let matched = MatchOutcome::Matched {
            file: "img-001".to_owned(),
            distance: 0,
        };
        let json = serde_json::to_string(&matched).unwrap();
        assert_eq!(json, r#"{"matched":true,"distance":0,"file":"img-001"}"#);
        assert_eq!(serde_json::from_str::<MatchOutcome>(&json).unwrap(), matched);

        let miss = serde_json::to_string(&MatchOutcome::NoMatch).unwrap();
        assert_eq!(miss, r#"{"matched":false}"#);
        assert_eq!(
            serde_json::from_str::<MatchOutcome>(&miss).unwrap(),
            MatchOutcome::NoMatch
        );
    }
}
