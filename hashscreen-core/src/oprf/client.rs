//! Client half of the OPRF roundtrip: blinding queries and unblinding
//! server responses.

use rand::{CryptoRng, Rng};

use crate::curve;
use crate::phash::PHash;

use super::{BlindedQuery, BlindingFactor, EvaluatedQuery, Token};

/// Blinds a perceptual hash for evaluation by the server.
///
/// Maps the hash bytes to a curve point with the pinned hash-to-curve suite
/// and multiplies by a fresh blinding factor. The factor must be kept for
/// [`unblind`] and is wiped when dropped.
pub fn blind<R: Rng + CryptoRng>(phash: &PHash, rng: &mut R) -> (BlindedQuery, BlindingFactor) {
    let factor = BlindingFactor::random(rng);
    let point = curve::hash_to_curve(&phash.to_bytes());
    let blinded = BlindedQuery(point * factor.scalar());
    (blinded, factor)
}

/// Unblinds a server response, recovering the PRF output `k·H(p)`.
///
/// Consumes the blinding factor; it cannot be reused afterwards.
pub fn unblind(response: EvaluatedQuery, factor: BlindingFactor) -> Token {
    let inverse = Option::<curve::Scalar>::from(factor.scalar().invert())
        .expect("blinding factors are sampled non-zero");
    Token(response.0 * inverse)
}
