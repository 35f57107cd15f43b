//! Perceptual hashing of images.
//!
//! Computes a 64-bit pHash: the image is decoded, resampled to 32x32,
//! reduced to luminance, transformed with a 2D DCT-II, and the top-left 8x8
//! coefficient block (minus the DC term) is thresholded against its median.
//! Visually close images yield hashes with a low Hamming distance, which is
//! the matching signal used by the match engine.
//!
//! The computation is deterministic on identical input bytes: the resampling
//! filter is fixed and all arithmetic is plain `f64`.

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SIZE: usize = 32;
const BLOCK: usize = 8;

/// Number of DCT coefficients carrying signal (8x8 block minus the DC term).
const COEFFS: usize = BLOCK * BLOCK - 1;

/// A 64-bit perceptual hash.
///
/// Only the low 63 bits carry signal; the most significant bit is always
/// zero. The canonical rendering is 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PHash(u64);

/// Errors raised while computing a perceptual hash.
#[derive(Debug, thiserror::Error)]
pub enum PHashError {
    /// The input bytes could not be decoded as an image.
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Error raised when parsing a [`PHash`] from its hex rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected 16 lowercase hex characters")]
pub struct InvalidPHash;

impl PHash {
    /// Wraps a raw 64-bit hash value.
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw 64-bit hash value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the hash as 8 big-endian bytes.
    ///
    /// This is the byte string fed into hash-to-curve when the hash is used
    /// as a PRF input.
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Number of differing bits between two hashes.
    pub fn hamming_distance(self, other: PHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PHash {
    type Err = InvalidPHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(InvalidPHash);
        }
        let value = u64::from_str_radix(s, 16).map_err(|_| InvalidPHash)?;
        Ok(Self(value))
    }
}

impl Serialize for PHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Computes the perceptual hash of an encoded image.
///
/// Total on decodable images; returns [`PHashError::Decode`] otherwise.
pub fn phash(image_bytes: &[u8]) -> Result<PHash, PHashError> {
    let img = image::load_from_memory(image_bytes)?;
    let small = img.resize_exact(SIZE as u32, SIZE as u32, FilterType::Triangle);
    let rgb = small.to_rgb8();

    let mut luma = [[0f64; SIZE]; SIZE];
    for y in 0..SIZE {
        for x in 0..SIZE {
            let [r, g, b] = rgb.get_pixel(x as u32, y as u32).0;
            luma[y][x] = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        }
    }

    let freq = dct2d(&luma);

    // 63 coefficients of the top-left 8x8 block, row-major, DC dropped.
    let mut coeffs = [0f64; COEFFS];
    let mut i = 0;
    for u in 0..BLOCK {
        for v in 0..BLOCK {
            if u == 0 && v == 0 {
                continue;
            }
            coeffs[i] = freq[u][v];
            i += 1;
        }
    }

    let median = median_odd(&coeffs);

    // MSB-first packing; the top bit stays zero since only 63 bits carry
    // signal.
    let mut hash = 0u64;
    for (i, c) in coeffs.iter().enumerate() {
        if *c > median {
            hash |= 1 << (62 - i);
        }
    }
    Ok(PHash(hash))
}

/// Forward 2D DCT-II with orthonormal scaling, applied separably.
fn dct2d(input: &[[f64; SIZE]; SIZE]) -> [[f64; SIZE]; SIZE] {
    let mut rows = [[0f64; SIZE]; SIZE];
    for y in 0..SIZE {
        rows[y] = dct1d(&input[y]);
    }
    let mut out = [[0f64; SIZE]; SIZE];
    for v in 0..SIZE {
        let mut column = [0f64; SIZE];
        for y in 0..SIZE {
            column[y] = rows[y][v];
        }
        let transformed = dct1d(&column);
        for u in 0..SIZE {
            out[u][v] = transformed[u];
        }
    }
    out
}

fn dct1d(input: &[f64; SIZE]) -> [f64; SIZE] {
    let n = SIZE as f64;
    let mut out = [0f64; SIZE];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut acc = 0f64;
        for (i, value) in input.iter().enumerate() {
            acc += value
                * (std::f64::consts::PI * (2.0 * i as f64 + 1.0) * k as f64 / (2.0 * n)).cos();
        }
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        *slot = scale * acc;
    }
    out
}

/// Median of an odd-length slice (the exact middle element after sorting).
fn median_odd(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("DCT coefficients are finite"));
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use super::*;

    fn encode_png(img: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("can encode png");
        out.into_inner()
    }

    fn gradient_image(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        });
        encode_png(&img)
    }

    /// An 8x8 grid of alternating blocks, independent of pixel dimensions.
    fn checker_image(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            if (x * 8 / width + y * 8 / height) % 2 == 0 {
                Rgb([235u8, 235, 235])
            } else {
                Rgb([20u8, 20, 20])
            }
        });
        encode_png(&img)
    }

    #[test]
    fn constant_image_hashes_to_zero() {
        // Every DCT coefficient of a constant image is zero, so no
        // coefficient exceeds the median.
        let img = ImageBuffer::from_pixel(64, 64, Rgb([200u8, 200, 200]));
        let hash = phash(&encode_png(&img)).unwrap();
        assert_eq!(hash.to_string(), "0000000000000000");
    }

    #[test]
    fn deterministic_on_identical_input() {
        let bytes = gradient_image(64, 48);
        assert_eq!(phash(&bytes).unwrap(), phash(&bytes).unwrap());
    }

    #[test]
    fn stable_under_rescaling() {
        // The same block pattern rendered at two pixel sizes lands on
        // nearby hashes.
        let a = phash(&checker_image(64, 64)).unwrap();
        let b = phash(&checker_image(128, 128)).unwrap();
        assert!(a.hamming_distance(b) <= 4, "distance {}", a.hamming_distance(b));
    }

    #[test]
    fn distinct_content_differs() {
        let a = phash(&gradient_image(64, 48)).unwrap();
        let b = phash(&checker_image(64, 48)).unwrap();
        assert!(a.hamming_distance(b) > 8);
    }

    #[test]
    fn high_bit_reserved() {
        let hash = phash(&gradient_image(64, 48)).unwrap();
        assert_eq!(hash.as_u64() >> 63, 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(phash(b"not an image"), Err(PHashError::Decode(_))));
    }

    #[test]
    fn hex_roundtrip() {
        let hash: PHash = "fffefcf8f0e0c080".parse().unwrap();
        assert_eq!(hash.to_string(), "fffefcf8f0e0c080");
        assert!("FFFEFCF8F0E0C080".parse::<PHash>().is_err());
        assert!("fffefcf8f0e0c08".parse::<PHash>().is_err());
    }
}
