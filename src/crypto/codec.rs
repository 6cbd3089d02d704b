//! String-level encryption with an embedded marker.
//!
//! An encrypted value is the base64 ciphertext with [`ENCRYPTION_MARKER`]
//! inserted at a random character offset. The marker is the only signal
//! that a value is encrypted; values without it are plaintext.

use super::cipher::{AesGcmCipher, Cipher};
use crate::error::CodecError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;

/// Token embedded in every encrypted value. Braces never occur in base64.
pub const ENCRYPTION_MARKER: &str = "{sv}";

/// Encrypts and decrypts individual string values.
#[derive(Debug, Default)]
pub struct EncryptionCodec<C = AesGcmCipher> {
    cipher: C,
}

impl<C: Cipher> EncryptionCodec<C> {
    pub fn new(cipher: C) -> Self {
        Self { cipher }
    }

    pub fn is_encrypted(&self, value: &str) -> bool {
        value.contains(ENCRYPTION_MARKER)
    }

    /// Encrypt `plaintext`. Two calls with the same input yield different
    /// strings because of the random marker position.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>, CodecError> {
        let Some(plaintext) = plaintext else {
            return Ok(None);
        };
        let ciphertext = self.cipher.encrypt(plaintext.as_bytes())?;
        let mut encoded = STANDARD.encode(ciphertext);
        // base64 is ASCII, so every char offset is a byte offset
        let offset = rand::rng().random_range(0..=encoded.len());
        encoded.insert_str(offset, ENCRYPTION_MARKER);
        Ok(Some(encoded))
    }

    /// Decrypt `text`. Values without the marker are returned unchanged.
    pub fn decrypt(&self, text: Option<&str>) -> Result<Option<String>, CodecError> {
        let Some(text) = text else {
            return Ok(None);
        };
        if !self.is_encrypted(text) {
            return Ok(Some(text.to_string()));
        }
        let encoded = text.replacen(ENCRYPTION_MARKER, "", 1);
        let ciphertext = STANDARD.decode(encoded.as_bytes())?;
        let plaintext = self.cipher.decrypt(&ciphertext)?;
        Ok(Some(String::from_utf8(plaintext)?))
    }
}
