#![deny(missing_docs)]
//! Cryptographic engine for privacy-preserving perceptual-hash screening.
//!
//! This crate implements the full protocol core shared by the screening
//! client and server:
//!
//! * [`phash`] — deterministic 64-bit perceptual hashes of images (DCT based).
//! * [`curve`] — P-256 scalar/point helpers, including the RFC-9380
//!   `P256_XMD:SHA-256_SSWU_RO_` hash-to-curve suite.
//! * [`oprf`] — the blind/evaluate/unblind roundtrip. Blinding ensures the
//!   server never learns the client's input; the server key never leaves the
//!   server.
//! * [`dleq`] — Chaum-Pedersen discrete log equality proofs (Fiat-Shamir),
//!   letting clients verify the server evaluated with its committed key.
//! * [`envelope`] — keyed-MAC integrity and freshness wrapper over responses.
//! * [`manifest`] — signed descriptors binding the evaluated-hash database
//!   to a content hash, timestamp and version.
//! * [`matcher`] — Hamming-distance membership test over evaluated tokens.
//! * [`vault`] — AES-256-GCM encryption of scan outcomes under a
//!   session-scoped key.
//!
//! The crate performs no I/O; transports and storage live in the client and
//! service crates.

pub mod canonical;
pub mod curve;
pub mod dleq;
pub mod envelope;
pub mod manifest;
pub mod matcher;
pub mod oprf;
pub mod phash;
pub mod time;
pub mod vault;
