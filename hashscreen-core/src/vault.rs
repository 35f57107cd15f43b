//! Session-scoped authenticated encryption of scan results at rest.
//!
//! Scan outcomes are encrypted with AES-256-GCM under a 256-bit key held in
//! volatile session storage. The key is loaded from a well-known slot on
//! first use and regenerated if absent or unparsable; it is never written to
//! durable storage. Ciphertexts go to a pluggable durable sink under
//! `result_`-prefixed keys.

use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zeroize::Zeroize;

use crate::canonical;
use crate::time::epoch_ms;

/// Well-known slot name of the session key in volatile storage.
pub const SESSION_KEY_SLOT: &str = "scan_session_key";

/// Prefix of every vault entry in the durable sink.
pub const RESULT_KEY_PREFIX: &str = "result_";

const KEY_LEN: usize = 32;
const IV_LEN: usize = 12;

/// An encrypted scan outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedResult {
    /// Base64 of the GCM output, 16-byte tag appended.
    pub ciphertext: String,
    /// Base64 of the 12 random IV bytes.
    pub iv: String,
    /// Milliseconds since the Unix epoch at encryption time.
    pub timestamp: u64,
}

/// Reasons vault operations fail.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The ciphertext failed GCM authentication.
    #[error("ciphertext failed authentication")]
    AuthFailure,
    /// The blob is structurally damaged (base64, length or JSON shape).
    #[error("stored blob is corrupt")]
    CorruptBlob,
    /// The plaintext could not be rendered as canonical JSON.
    #[error("cannot canonicalize result: {0}")]
    Canonical(#[from] serde_json::Error),
}

/// Volatile session-scoped key storage.
///
/// Implementations must not persist values beyond the session.
pub trait SessionKeyStore: Send + Sync {
    /// Reads the raw bytes stored in `slot`, if any.
    fn load(&self, slot: &str) -> Option<Vec<u8>>;
    /// Stores raw bytes under `slot`.
    fn store(&self, slot: &str, value: &[u8]);
    /// Removes `slot`.
    fn clear(&self, slot: &str);
}

/// Durable key-value sink for encrypted results.
pub trait ResultSink: Send + Sync {
    /// Stores a serialized [`EncryptedResult`] under `key`.
    fn put(&self, key: &str, value: String);
    /// Reads the serialized entry stored under `key`.
    fn get(&self, key: &str) -> Option<String>;
    /// Lists all stored keys.
    fn keys(&self) -> Vec<String>;
    /// Removes `key`.
    fn remove(&self, key: &str);
}

/// In-memory [`SessionKeyStore`].
#[derive(Default)]
pub struct MemorySessionStore(Mutex<HashMap<String, Vec<u8>>>);

impl SessionKeyStore for MemorySessionStore {
    fn load(&self, slot: &str) -> Option<Vec<u8>> {
        self.0.lock().get(slot).cloned()
    }

    fn store(&self, slot: &str, value: &[u8]) {
        self.0.lock().insert(slot.to_owned(), value.to_vec());
    }

    fn clear(&self, slot: &str) {
        if let Some(mut value) = self.0.lock().remove(slot) {
            value.zeroize();
        }
    }
}

/// In-memory [`ResultSink`].
#[derive(Default)]
pub struct MemoryResultSink(Mutex<HashMap<String, String>>);

impl ResultSink for MemoryResultSink {
    fn put(&self, key: &str, value: String) {
        self.0.lock().insert(key.to_owned(), value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.0.lock().keys().cloned().collect()
    }

    fn remove(&self, key: &str) {
        self.0.lock().remove(key);
    }
}

/// The vault: encrypts scan outcomes under the session key and stores them
/// in the durable sink.
///
/// Writes are serialized through an internal lock so concurrent scans cannot
/// lose entries; correctness of one scan never depends on another.
pub struct ResultVault {
    session_store: Arc<dyn SessionKeyStore>,
    sink: Arc<dyn ResultSink>,
    key: Mutex<Option<[u8; KEY_LEN]>>,
}

impl ResultVault {
    /// Creates a vault over the given session store and durable sink.
    pub fn new(session_store: Arc<dyn SessionKeyStore>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            session_store,
            sink,
            key: Mutex::new(None),
        }
    }

    /// Encrypts a value under the session key.
    pub fn encrypt<T: Serialize>(&self, value: &T) -> Result<EncryptedResult, VaultError> {
        let plaintext = canonical::to_string(value)?;
        let key = self.session_key();
        let cipher = Aes256Gcm::new_from_slice(&key).expect("session keys are 32 bytes");
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .expect("GCM encryption of in-memory plaintext cannot fail");
        Ok(EncryptedResult {
            ciphertext: BASE64.encode(ciphertext),
            iv: BASE64.encode(iv),
            timestamp: epoch_ms(),
        })
    }

    /// Decrypts a previously encrypted value.
    ///
    /// Structural damage maps to [`VaultError::CorruptBlob`], authentication
    /// failure to [`VaultError::AuthFailure`].
    pub fn decrypt<T: DeserializeOwned>(&self, enc: &EncryptedResult) -> Result<T, VaultError> {
        let ciphertext = BASE64
            .decode(&enc.ciphertext)
            .map_err(|_| VaultError::CorruptBlob)?;
        let iv = BASE64.decode(&enc.iv).map_err(|_| VaultError::CorruptBlob)?;
        if iv.len() != IV_LEN {
            return Err(VaultError::CorruptBlob);
        }
        let key = self.session_key();
        let cipher = Aes256Gcm::new_from_slice(&key).expect("session keys are 32 bytes");
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| VaultError::AuthFailure)?;
        serde_json::from_slice(&plaintext).map_err(|_| VaultError::CorruptBlob)
    }

    /// Encrypts and stores a value under `result_<id>`.
    pub fn store<T: Serialize>(&self, id: &str, value: &T) -> Result<(), VaultError> {
        let enc = self.encrypt(value)?;
        let serialized = serde_json::to_string(&enc)?;
        self.sink.put(&format!("{RESULT_KEY_PREFIX}{id}"), serialized);
        Ok(())
    }

    /// Loads and decrypts the value stored under `result_<id>`.
    ///
    /// Returns `Ok(None)` when nothing is stored. Damaged entries are
    /// dropped from the sink before the error is returned; they are never
    /// retried.
    pub fn load<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, VaultError> {
        let key = format!("{RESULT_KEY_PREFIX}{id}");
        let Some(serialized) = self.sink.get(&key) else {
            return Ok(None);
        };
        let enc: EncryptedResult =
            serde_json::from_str(&serialized).map_err(|_| VaultError::CorruptBlob)?;
        match self.decrypt(&enc) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.sink.remove(&key);
                Err(err)
            }
        }
    }

    /// Removes every `result_`-prefixed entry and wipes the session key.
    pub fn clear_all(&self) {
        for key in self.sink.keys() {
            if key.starts_with(RESULT_KEY_PREFIX) {
                self.sink.remove(&key);
            }
        }
        if let Some(mut key) = self.key.lock().take() {
            key.zeroize();
        }
        self.session_store.clear(SESSION_KEY_SLOT);
    }

    /// Returns the session key, loading or generating it on first use.
    fn session_key(&self) -> [u8; KEY_LEN] {
        let mut cached = self.key.lock();
        if let Some(key) = *cached {
            return key;
        }
        let key = match self
            .session_store
            .load(SESSION_KEY_SLOT)
            .and_then(|bytes| <[u8; KEY_LEN]>::try_from(bytes).ok())
        {
            Some(key) => key,
            None => {
                let mut key = [0u8; KEY_LEN];
                rand::rngs::OsRng.fill_bytes(&mut key);
                self.session_store.store(SESSION_KEY_SLOT, &key);
                key
            }
        };
        *cached = Some(key);
        key
    }
}
