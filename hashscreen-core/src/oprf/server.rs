//! Server half of the OPRF roundtrip: evaluation under the secret key.

use rand::{CryptoRng, Rng};
use zeroize::Zeroize;

use crate::curve::{self, CurveError, ProjectivePoint, Scalar};
use crate::phash::PHash;

use super::{BlindedQuery, EvaluatedQuery, Token};

/// The server's OPRF key pair: the secret scalar `k` and its public
/// commitment `K = k·G`.
///
/// `k` is loaded once at startup and is immutable afterwards; the commitment
/// is precomputed here so request handlers only ever read. The secret scalar
/// is wiped on drop. `Debug` prints the commitment only.
pub struct OprfKey {
    secret: Scalar,
    public: ProjectivePoint,
}

impl Drop for OprfKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for OprfKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OprfKey")
            .field("public", &curve::encode_point(&self.public))
            .finish_non_exhaustive()
    }
}

impl OprfKey {
    /// Builds a key pair from a non-zero secret scalar.
    pub fn from_scalar(secret: Scalar) -> Result<Self, CurveError> {
        if bool::from(elliptic_curve::Field::is_zero(&secret)) {
            return Err(CurveError::ZeroScalar);
        }
        let public = ProjectivePoint::GENERATOR * secret;
        Ok(Self { secret, public })
    }

    /// Parses the key from the base-10 rendering used by the environment.
    pub fn from_decimal(decimal: &str) -> Result<Self, CurveError> {
        Self::from_scalar(curve::scalar_from_decimal(decimal)?)
    }

    /// Samples a random key pair.
    pub fn random<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self::from_scalar(curve::random_nonzero_scalar(rng))
            .expect("sampled scalars are non-zero")
    }

    /// Returns the public commitment `K = k·G`.
    pub fn public_key(&self) -> ProjectivePoint {
        self.public
    }

    /// Evaluates a blinded query, returning `k·P'`.
    pub fn evaluate(&self, blinded: &BlindedQuery) -> EvaluatedQuery {
        EvaluatedQuery(blinded.0 * self.secret)
    }

    /// Directly computes the PRF output `k·H(p)` for a known input.
    ///
    /// This is the offline path used when building the evaluated-hash
    /// database; the online protocol only ever sees blinded points.
    pub fn evaluate_unblinded(&self, phash: &PHash) -> Token {
        Token(curve::hash_to_curve(&phash.to_bytes()) * self.secret)
    }

    pub(crate) fn secret(&self) -> &Scalar {
        &self.secret
    }
}
