//! AES-256-GCM with fixed key material.

use crate::error::CodecError;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use sha2::{Digest, Sha256};

/// Passphrase used when the caller supplies no key material.
const DEFAULT_PASSPHRASE: &str = "settings-vault/default-key/v1";

/// Opaque symmetric primitive used by the codec.
///
/// Implementations must be deterministic: equal plaintexts produce equal
/// ciphertexts.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// AES-256-GCM with a fixed nonce, making it deterministic per key.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
    nonce: [u8; 12],
}

impl AesGcmCipher {
    pub fn new(key: &[u8; 32], nonce: [u8; 12]) -> Result<Self, CodecError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher, nonce })
    }

    /// Derive key and nonce from a passphrase with SHA-256.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CodecError> {
        let key: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();

        let mut hasher = Sha256::new();
        hasher.update(b"nonce:");
        hasher.update(passphrase.as_bytes());
        let digest = hasher.finalize();
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&digest[..12]);

        Self::new(&key, nonce)
    }

    /// Cipher keyed with the built-in passphrase.
    pub fn builtin() -> Self {
        let key: [u8; 32] = Sha256::digest(DEFAULT_PASSPHRASE.as_bytes()).into();
        let nonce = [0x5eu8; 12];
        Self {
            cipher: Aes256Gcm::new(&key.into()),
            nonce,
        }
    }
}

impl Default for AesGcmCipher {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.cipher
            .encrypt(Nonce::from_slice(&self.nonce), plaintext)
            .map_err(|e| CodecError::Cipher(format!("encryption failed: {}", e)))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.cipher
            .decrypt(Nonce::from_slice(&self.nonce), ciphertext)
            .map_err(|e| CodecError::Cipher(format!("decryption failed (wrong key or corrupted data): {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = AesGcmCipher::default();
        let ciphertext = cipher.encrypt(b"secret settings").unwrap();
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"secret settings");
    }

    #[test]
    fn test_deterministic() {
        let cipher = AesGcmCipher::from_passphrase("hunter2").unwrap();
        assert_eq!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = AesGcmCipher::from_passphrase("one").unwrap();
        let b = AesGcmCipher::from_passphrase("two").unwrap();
        let ciphertext = a.encrypt(b"secret").unwrap();
        assert!(b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = AesGcmCipher::default();
        let mut ciphertext = cipher.encrypt(b"secret").unwrap();
        ciphertext[0] ^= 0xFF;
        assert!(cipher.decrypt(&ciphertext).is_err());
    }
}
