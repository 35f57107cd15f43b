//! Chaum-Pedersen discrete log equality proofs.
//!
//! Proves that the server's response `Q` was computed with the same secret
//! behind its published commitment `K`: knowledge of `k` such that
//! `K = k·G` and `Q = k·P'`, without revealing `k`. The interactive protocol
//! is made non-interactive with the Fiat-Shamir transform; the challenge
//! binds both commitment legs so neither can be forged independently.
//!
//! The challenge layout is part of the wire contract: SHA-256 over the
//! concatenated lowercase compressed-SEC1 hex renderings (no `0x` prefix) of
//! `G`, `K`, `P'`, `Q`, `R1`, `R2`, reduced mod the group order.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::curve::{self, ProjectivePoint, Scalar};
use crate::oprf::server::OprfKey;
use crate::oprf::{BlindedQuery, EvaluatedQuery};

/// A non-interactive proof that two pairs share the same discrete log.
///
/// On the wire this renders as
/// `{ "challenge": hex, "response": hex, "commitment": "hex|hex" }`.
#[derive(Debug, Clone, PartialEq)]
pub struct DleqProof {
    challenge: Scalar,
    response: Scalar,
    commitment: (ProjectivePoint, ProjectivePoint),
}

/// Reasons a [`DleqProof`] fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DleqError {
    /// The recomputed Fiat-Shamir challenge differs from the one in the
    /// proof.
    #[error("challenge does not match the proof transcript")]
    ChallengeMismatch,
    /// The verification equation against the base point failed
    /// (`s·G ≠ R1 + c·K`).
    #[error("base-point equation does not hold")]
    BaseEquation,
    /// The verification equation against the blinded query failed
    /// (`s·P' ≠ R2 + c·Q`).
    #[error("blinded-point equation does not hold")]
    BlindedEquation,
}

impl DleqProof {
    /// Proves that `evaluated` was computed from `blinded` with the secret
    /// behind `commitment`.
    ///
    /// `commitment` is the public key bound into the challenge transcript;
    /// an honest server passes its own. The ephemeral nonce is wiped before
    /// returning.
    pub fn prove<R: Rng + CryptoRng>(
        key: &OprfKey,
        commitment: &ProjectivePoint,
        blinded: &BlindedQuery,
        evaluated: &EvaluatedQuery,
        rng: &mut R,
    ) -> Self {
        let mut nonce = curve::random_nonzero_scalar(rng);
        let r1 = ProjectivePoint::GENERATOR * nonce;
        let r2 = blinded.point() * nonce;
        let challenge = challenge_hash(
            commitment,
            &blinded.point(),
            &evaluated.point(),
            &r1,
            &r2,
        );
        let response = nonce + challenge * key.secret();
        nonce.zeroize();
        Self {
            challenge,
            response,
            commitment: (r1, r2),
        }
    }

    /// Verifies the proof against the published key commitment.
    ///
    /// Recomputes the challenge from the transcript first, then checks both
    /// verification equations. All failures are terminal; callers must not
    /// fall back to an unverified path.
    pub fn verify(
        &self,
        public_key: &ProjectivePoint,
        blinded: &BlindedQuery,
        evaluated: &EvaluatedQuery,
    ) -> Result<(), DleqError> {
        let (r1, r2) = self.commitment;
        let expected = challenge_hash(
            public_key,
            &blinded.point(),
            &evaluated.point(),
            &r1,
            &r2,
        );
        if expected != self.challenge {
            return Err(DleqError::ChallengeMismatch);
        }
        if ProjectivePoint::GENERATOR * self.response != r1 + *public_key * self.challenge {
            return Err(DleqError::BaseEquation);
        }
        if blinded.point() * self.response != r2 + evaluated.point() * self.challenge {
            return Err(DleqError::BlindedEquation);
        }
        Ok(())
    }
}

/// Evaluates a blinded query and proves the evaluation in one step.
pub fn evaluate_with_proof<R: Rng + CryptoRng>(
    key: &OprfKey,
    blinded: &BlindedQuery,
    rng: &mut R,
) -> (EvaluatedQuery, DleqProof) {
    let evaluated = key.evaluate(blinded);
    let proof = DleqProof::prove(key, &key.public_key(), blinded, &evaluated, rng);
    (evaluated, proof)
}

/// The Fiat-Shamir challenge over the fixed transcript layout.
fn challenge_hash(
    public_key: &ProjectivePoint,
    blinded: &ProjectivePoint,
    evaluated: &ProjectivePoint,
    r1: &ProjectivePoint,
    r2: &ProjectivePoint,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(curve::encode_point(&ProjectivePoint::GENERATOR).as_bytes());
    hasher.update(curve::encode_point(public_key).as_bytes());
    hasher.update(curve::encode_point(blinded).as_bytes());
    hasher.update(curve::encode_point(evaluated).as_bytes());
    hasher.update(curve::encode_point(r1).as_bytes());
    hasher.update(curve::encode_point(r2).as_bytes());
    curve::scalar_from_digest(&hasher.finalize().into())
}

#[derive(Serialize, Deserialize)]
struct WireProof {
    challenge: String,
    response: String,
    commitment: String,
}

impl Serialize for DleqProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireProof {
            challenge: curve::encode_scalar(&self.challenge),
            response: curve::encode_scalar(&self.response),
            commitment: format!(
                "{}|{}",
                curve::encode_point(&self.commitment.0),
                curve::encode_point(&self.commitment.1)
            ),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DleqProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;
        let wire = WireProof::deserialize(deserializer)?;
        let challenge = curve::decode_scalar(&wire.challenge).map_err(D::Error::custom)?;
        let response = curve::decode_scalar(&wire.response).map_err(D::Error::custom)?;
        let (r1, r2) = wire
            .commitment
            .split_once('|')
            .ok_or_else(|| D::Error::custom("commitment must be two points joined by '|'"))?;
        let r1 = curve::decode_point(r1).map_err(D::Error::custom)?;
        let r2 = curve::decode_point(r2).map_err(D::Error::custom)?;
        Ok(Self {
            challenge,
            response,
            commitment: (r1, r2),
        })
    }
}
