//! Field-level encryption: an opaque deterministic [`Cipher`] wrapped by the
//! marker-aware [`EncryptionCodec`].

mod cipher;
mod codec;

pub use cipher::{AesGcmCipher, Cipher};
pub use codec::{ENCRYPTION_MARKER, EncryptionCodec};
