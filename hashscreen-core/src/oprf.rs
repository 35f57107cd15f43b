//! Core types of the OPRF roundtrip.
//!
//! The client maps a perceptual hash to a curve point, blinds it with a
//! fresh scalar and sends only the blinded point. The server multiplies by
//! its secret key and the client divides the blinding factor back out,
//! recovering `k·H(p)` without the server ever seeing `p` and without the
//! client learning `k`.
//!
//! See the [`client`] module for the blinding/unblinding half and the
//! [`server`] module for evaluation under the secret key.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::{self, CurveError, ProjectivePoint, Scalar};

pub mod client;
pub mod server;

/// A blinded OPRF query: the point `r·H(p)` sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlindedQuery(#[serde(with = "curve::point_hex")] ProjectivePoint);

/// The server's response to a blinded query: the point `k·r·H(p)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluatedQuery(#[serde(with = "curve::point_hex")] ProjectivePoint);

/// An unblinded PRF output `k·H(p)`.
///
/// Deterministic per input under a fixed server key; this is what the
/// evaluated-hash database stores and what the match engine compares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(#[serde(with = "curve::point_hex")] ProjectivePoint);

/// The blinding factor of one query.
///
/// Freshly sampled per scan and consumed by unblinding; the scalar is wiped
/// from memory on drop. Deliberately neither `Clone` nor `Copy` so a factor
/// cannot outlive its single use.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BlindingFactor(Scalar);

impl BlindedQuery {
    /// Wraps an already-validated curve point.
    pub fn new(point: ProjectivePoint) -> Self {
        Self(point)
    }

    /// Parses a blinded query from compressed-SEC1 hex.
    pub fn from_hex(hex_point: &str) -> Result<Self, CurveError> {
        curve::decode_point(hex_point).map(Self)
    }

    /// Returns the blinded point.
    pub fn point(&self) -> ProjectivePoint {
        self.0
    }

    /// Renders the blinded point as compressed-SEC1 hex.
    pub fn to_hex(&self) -> String {
        curve::encode_point(&self.0)
    }
}

impl EvaluatedQuery {
    /// Wraps an already-validated curve point.
    pub fn new(point: ProjectivePoint) -> Self {
        Self(point)
    }

    /// Parses an evaluated query from compressed-SEC1 hex.
    pub fn from_hex(hex_point: &str) -> Result<Self, CurveError> {
        curve::decode_point(hex_point).map(Self)
    }

    /// Returns the evaluated point.
    pub fn point(&self) -> ProjectivePoint {
        self.0
    }

    /// Renders the evaluated point as compressed-SEC1 hex.
    pub fn to_hex(&self) -> String {
        curve::encode_point(&self.0)
    }
}

impl Token {
    /// Parses a token from compressed-SEC1 hex.
    pub fn from_hex(hex_point: &str) -> Result<Self, CurveError> {
        curve::decode_point(hex_point).map(Self)
    }

    /// Renders the token as compressed-SEC1 hex.
    pub fn to_hex(&self) -> String {
        curve::encode_point(&self.0)
    }

    /// Returns the 33-byte compressed encoding the match engine compares.
    pub fn to_bytes(&self) -> [u8; curve::COMPRESSED_POINT_LEN] {
        curve::point_bytes(&self.0)
    }
}

impl BlindingFactor {
    /// Samples a fresh blinding factor uniformly from `[1, n)`.
    pub fn random<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        Self(curve::random_nonzero_scalar(rng))
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use crate::phash::PHash;

    use super::server::OprfKey;
    use super::*;

    #[test]
    fn unblinded_output_is_independent_of_blinding() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let phash: PHash = "fffefcf8f0e0c080".parse().unwrap();

        let (blinded_a, factor_a) = client::blind(&phash, &mut rng);
        let (blinded_b, factor_b) = client::blind(&phash, &mut rng);
        assert_ne!(blinded_a, blinded_b);

        let token_a = client::unblind(key.evaluate(&blinded_a), factor_a);
        let token_b = client::unblind(key.evaluate(&blinded_b), factor_b);
        assert_eq!(token_a, token_b);
        assert_eq!(token_a, key.evaluate_unblinded(&phash));
    }

    #[test]
    fn distinct_inputs_produce_distinct_tokens() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let a: PHash = "fffefcf8f0e0c080".parse().unwrap();
        let b: PHash = "0123456789abcdef".parse().unwrap();
        assert_ne!(key.evaluate_unblinded(&a), key.evaluate_unblinded(&b));
    }

    #[test]
    fn wire_roundtrip() {
        let mut rng = rand::thread_rng();
        let phash: PHash = "0123456789abcdef".parse().unwrap();
        let (blinded, _factor) = client::blind(&phash, &mut rng);
        let hex_point = blinded.to_hex();
        assert_eq!(BlindedQuery::from_hex(&hex_point).unwrap(), blinded);
    }
}
