//! The server's OPRF key material.
//!
//! The secret scalar is loaded once from the environment at startup; its
//! public commitment is computed here and held immutably for the lifetime of
//! the process. Request handlers only ever read, so the material can be
//! shared freely across concurrent requests.

use std::sync::Arc;

use hashscreen_core::curve;
use hashscreen_core::oprf::server::OprfKey;
use hashscreen_core::time::epoch_ms;
use hashscreen_types::KeyCommitment;
use secrecy::{ExposeSecret, SecretString};

/// Immutable per-process key material: the secret key and its published
/// commitment.
#[derive(Clone)]
pub(crate) struct KeyMaterial {
    key: Arc<OprfKey>,
    commitment: KeyCommitment,
}

impl KeyMaterial {
    /// Loads the key from its base-10 environment rendering and precomputes
    /// the commitment artifact.
    pub(crate) fn from_secret(secret: &SecretString, version: &str) -> eyre::Result<Self> {
        let key = OprfKey::from_decimal(secret.expose_secret())
            .map_err(|err| eyre::eyre!("SERVER_OPRF_KEY is not a usable scalar: {err}"))?;
        let commitment = KeyCommitment {
            public_key: curve::encode_point(&key.public_key()),
            timestamp: epoch_ms(),
            version: version.to_owned(),
        };
        Ok(Self {
            key: Arc::new(key),
            commitment,
        })
    }

    /// Returns the secret key for evaluation.
    pub(crate) fn key(&self) -> &OprfKey {
        &self.key
    }

    /// Returns the published commitment artifact.
    pub(crate) fn commitment(&self) -> &KeyCommitment {
        &self.commitment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_matches_key() {
        let material =
            KeyMaterial::from_secret(&SecretString::from("123456789123456789"), "1.0.0").unwrap();
        assert_eq!(
            material.commitment().public_key,
            curve::encode_point(&material.key().public_key())
        );
        assert_eq!(material.commitment().version, "1.0.0");
    }

    #[test]
    fn rejects_unusable_scalars() {
        assert!(KeyMaterial::from_secret(&SecretString::from("0"), "1.0.0").is_err());
        assert!(KeyMaterial::from_secret(&SecretString::from("not a number"), "1.0.0").is_err());
    }
}
