//! Encryption primitives for whole-payload encryption
//!
//! The engine encrypts the entire payload before splitting it into chunks
//! (and decrypts after reassembly). Chunks are transport units, not
//! security boundaries, so there is no per-chunk cryptography.
//!
//! Two AEAD suites are supported, both with 32-byte keys, 12-byte nonces
//! and 16-byte authentication tags. The nonce is generated fresh per
//! encryption and prepended to the ciphertext.

use crate::error::{EngineError, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaChaNonce};
use std::fmt;
use std::str::FromStr;

/// AEAD key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// AEAD nonce size (12 bytes / 96 bits)
pub const NONCE_SIZE: usize = 12;

/// AEAD authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Supported AEAD cipher suites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl CipherAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherAlgorithm::Aes256Gcm => "aes-256-gcm",
            CipherAlgorithm::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-256-gcm" => Ok(CipherAlgorithm::Aes256Gcm),
            "chacha20-poly1305" => Ok(CipherAlgorithm::ChaCha20Poly1305),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown cipher algorithm: {other}"
            ))),
        }
    }
}

/// Symmetric encryption key
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generate a new random encryption key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (validates length)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != KEY_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "invalid key length: expected {KEY_SIZE}, got {}",
                slice.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(slice);
        Ok(Self(key))
    }

    /// Derive a key from a passphrase using Argon2
    pub fn derive_from_passphrase(passphrase: &[u8], salt: &[u8]) -> Result<Self> {
        use argon2::password_hash::SaltString;
        use argon2::{Argon2, PasswordHasher};

        // Salt strings must be base64-encoded
        let salt_b64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD_NO_PAD, salt);
        let salt_string = SaltString::from_b64(&salt_b64)
            .map_err(|e| EngineError::Encryption(e.to_string()))?;

        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(passphrase, &salt_string)
            .map_err(|e| EngineError::Encryption(e.to_string()))?;

        let hash_bytes = password_hash
            .hash
            .ok_or_else(|| EngineError::Encryption("no hash output".to_string()))?;

        Self::from_slice(hash_bytes.as_bytes())
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey([REDACTED])")
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Cipher suite plus key material, fixed at engine construction
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    algorithm: CipherAlgorithm,
    key: EncryptionKey,
}

impl EncryptionConfig {
    pub fn new(algorithm: CipherAlgorithm, key: EncryptionKey) -> Self {
        Self { algorithm, key }
    }

    /// AES-256-GCM with the given key
    pub fn aes256_gcm(key: EncryptionKey) -> Self {
        Self::new(CipherAlgorithm::Aes256Gcm, key)
    }

    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }
}

/// Encrypt a payload, prepending a fresh random nonce to the ciphertext
pub fn encrypt(plaintext: &[u8], config: &EncryptionConfig) -> Result<Vec<u8>> {
    use rand::RngCore;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = match config.algorithm {
        CipherAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(config.key.as_bytes())
                .map_err(|e| EngineError::Encryption(e.to_string()))?;
            cipher
                .encrypt(Nonce::from_slice(&nonce), plaintext)
                .map_err(|e| EngineError::Encryption(e.to_string()))?
        }
        CipherAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(config.key.as_bytes())
                .map_err(|e| EngineError::Encryption(e.to_string()))?;
            cipher
                .encrypt(ChaChaNonce::from_slice(&nonce), plaintext)
                .map_err(|e| EngineError::Encryption(e.to_string()))?
        }
    };

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a payload produced by [`encrypt`]
///
/// Fails loudly on a wrong key, wrong algorithm or tampered ciphertext:
/// AEAD tag verification rejects all three.
pub fn decrypt(data: &[u8], config: &EncryptionConfig) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(EngineError::Decryption(
            "data too short for encrypted content".to_string(),
        ));
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    match config.algorithm {
        CipherAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(config.key.as_bytes())
                .map_err(|e| EngineError::Decryption(e.to_string()))?;
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| EngineError::Decryption("authentication failed".to_string()))
        }
        CipherAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(config.key.as_bytes())
                .map_err(|e| EngineError::Decryption(e.to_string()))?;
            cipher
                .decrypt(ChaChaNonce::from_slice(nonce), ciphertext)
                .map_err(|_| EngineError::Decryption("authentication failed".to_string()))
        }
    }
}
