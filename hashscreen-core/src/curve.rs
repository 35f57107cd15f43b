//! P-256 scalar and point helpers.
//!
//! All group arithmetic comes from the RustCrypto `p256` implementation,
//! which is constant-time for secret-dependent operations. This module adds
//! the encodings the protocol pins down: lowercase compressed-SEC1 hex for
//! points, 32-byte big-endian lowercase hex for scalars, and the RFC-9380
//! `P256_XMD:SHA-256_SSWU_RO_` hash-to-curve suite so that evaluated-hash
//! databases are interoperable across implementations.

use elliptic_curve::bigint::U256;
use elliptic_curve::hash2curve::{ExpandMsgXmd, GroupDigest};
use elliptic_curve::ops::Reduce;
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use elliptic_curve::{Field, PrimeField};
use p256::{AffinePoint, EncodedPoint, NistP256};
use rand::{CryptoRng, Rng};
use sha2::Sha256;

pub use p256::{ProjectivePoint, Scalar};

/// Length of a compressed SEC1 point encoding.
pub const COMPRESSED_POINT_LEN: usize = 33;

/// Domain separation tag of the pinned hash-to-curve suite.
///
/// Databases produced under this tag are usable by any implementation of the
/// RFC-9380 P-256 SSWU random-oracle suite with the same tag.
pub const HASH_TO_CURVE_DST: &[u8] = b"P256_XMD:SHA-256_SSWU_RO_";

/// Errors raised by scalar and point (de)serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    /// The bytes are not a valid compressed P-256 point, or encode the
    /// identity.
    #[error("invalid point encoding")]
    InvalidPoint,
    /// The string is not a canonical scalar encoding.
    #[error("invalid scalar encoding")]
    InvalidScalar,
    /// The scalar reduced to zero, which is forbidden for secrets and
    /// blinding factors.
    #[error("scalar must be non-zero")]
    ZeroScalar,
}

/// Samples a scalar uniformly from `[1, n)`.
pub fn random_nonzero_scalar<R: Rng + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let candidate = Scalar::random(&mut *rng);
        if !bool::from(candidate.is_zero()) {
            return candidate;
        }
    }
}

/// Maps arbitrary bytes to a curve point with the pinned RFC-9380 suite.
pub fn hash_to_curve(input: &[u8]) -> ProjectivePoint {
    NistP256::hash_from_bytes::<ExpandMsgXmd<Sha256>>(&[input], &[HASH_TO_CURVE_DST])
        .expect("the pinned domain separation tag is non-empty and short")
}

/// Encodes a point as lowercase compressed-SEC1 hex (66 characters).
pub fn encode_point(point: &ProjectivePoint) -> String {
    hex::encode(point.to_affine().to_encoded_point(true).as_bytes())
}

/// Returns the 33-byte compressed SEC1 encoding of a point.
pub fn point_bytes(point: &ProjectivePoint) -> [u8; COMPRESSED_POINT_LEN] {
    point
        .to_affine()
        .to_encoded_point(true)
        .as_bytes()
        .try_into()
        .expect("compressed P-256 encoding is 33 bytes")
}

/// Decodes a lowercase compressed-SEC1 hex point.
///
/// Rejects malformed hex, off-curve encodings and the point at infinity.
pub fn decode_point(hex_point: &str) -> Result<ProjectivePoint, CurveError> {
    let bytes = hex::decode(hex_point).map_err(|_| CurveError::InvalidPoint)?;
    if bytes.len() != COMPRESSED_POINT_LEN {
        return Err(CurveError::InvalidPoint);
    }
    let encoded = EncodedPoint::from_bytes(&bytes).map_err(|_| CurveError::InvalidPoint)?;
    let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
    let affine = affine.ok_or(CurveError::InvalidPoint)?;
    if bool::from(affine.is_identity()) {
        return Err(CurveError::InvalidPoint);
    }
    Ok(ProjectivePoint::from(affine))
}

/// Encodes a scalar as 64 lowercase hex characters (32-byte big-endian).
pub fn encode_scalar(scalar: &Scalar) -> String {
    hex::encode(scalar.to_bytes())
}

/// Decodes a canonical scalar from 64 hex characters.
///
/// Rejects values that are not reduced mod the group order.
pub fn decode_scalar(hex_scalar: &str) -> Result<Scalar, CurveError> {
    let bytes = hex::decode(hex_scalar).map_err(|_| CurveError::InvalidScalar)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| CurveError::InvalidScalar)?;
    let scalar: Option<Scalar> = Scalar::from_repr(bytes.into()).into();
    scalar.ok_or(CurveError::InvalidScalar)
}

/// Parses a scalar from a base-10 string, reducing mod the group order.
///
/// This is the format of the `SERVER_OPRF_KEY` environment variable. Fails
/// on non-digit input and on values that reduce to zero.
pub fn scalar_from_decimal(decimal: &str) -> Result<Scalar, CurveError> {
    if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CurveError::InvalidScalar);
    }
    let ten = Scalar::from(10u64);
    let mut acc = Scalar::ZERO;
    for digit in decimal.bytes() {
        acc = acc * ten + Scalar::from(u64::from(digit - b'0'));
    }
    if bool::from(acc.is_zero()) {
        return Err(CurveError::ZeroScalar);
    }
    Ok(acc)
}

/// Reduces a 32-byte SHA-256 digest to a scalar mod the group order.
pub fn scalar_from_digest(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(digest))
}

/// Serde adapter rendering points as lowercase compressed-SEC1 hex.
pub mod point_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{decode_point, encode_point, ProjectivePoint};

    /// Serializes a point as its hex encoding.
    pub fn serialize<S: Serializer>(
        point: &ProjectivePoint,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_point(point))
    }

    /// Deserializes a point from its hex encoding.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ProjectivePoint, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_point(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_roundtrip() {
        let hex_g = encode_point(&ProjectivePoint::GENERATOR);
        assert_eq!(hex_g.len(), 2 * COMPRESSED_POINT_LEN);
        assert_eq!(decode_point(&hex_g).unwrap(), ProjectivePoint::GENERATOR);
    }

    #[test]
    fn generator_matches_fips_constant() {
        // FIPS 186-4, D.1.2.3: x-coordinate of the P-256 base point.
        assert_eq!(
            encode_point(&ProjectivePoint::GENERATOR),
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"
        );
    }

    #[test]
    fn rejects_identity_and_garbage() {
        assert_eq!(decode_point("00"), Err(CurveError::InvalidPoint));
        assert_eq!(decode_point("zz"), Err(CurveError::InvalidPoint));
        // 33 zero bytes is the SEC1 identity encoding padded out, not a
        // valid compressed point.
        assert_eq!(
            decode_point(&"00".repeat(COMPRESSED_POINT_LEN)),
            Err(CurveError::InvalidPoint)
        );
    }

    #[test]
    fn hash_to_curve_is_deterministic() {
        let a = hash_to_curve(b"fffefcf8f0e0c080");
        let b = hash_to_curve(b"fffefcf8f0e0c080");
        let c = hash_to_curve(b"0123456789abcdef");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn decimal_scalar_parsing() {
        assert_eq!(scalar_from_decimal("10").unwrap(), Scalar::from(10u64));
        assert_eq!(
            scalar_from_decimal("123456789123456789").unwrap(),
            Scalar::from(123456789123456789u64)
        );
        assert_eq!(scalar_from_decimal("0"), Err(CurveError::ZeroScalar));
        assert_eq!(scalar_from_decimal(""), Err(CurveError::InvalidScalar));
        assert_eq!(scalar_from_decimal("12a"), Err(CurveError::InvalidScalar));
    }

    #[test]
    fn scalar_hex_roundtrip() {
        let mut rng = rand::thread_rng();
        let scalar = random_nonzero_scalar(&mut rng);
        assert_eq!(decode_scalar(&encode_scalar(&scalar)).unwrap(), scalar);
        // Non-canonical: the group order itself.
        assert_eq!(
            decode_scalar("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
            Err(CurveError::InvalidScalar)
        );
    }

    #[test]
    fn random_scalars_are_nonzero_and_distinct() {
        let mut rng = rand::thread_rng();
        let a = random_nonzero_scalar(&mut rng);
        let b = random_nonzero_scalar(&mut rng);
        assert!(!bool::from(a.is_zero()));
        assert_ne!(a, b);
    }
}
