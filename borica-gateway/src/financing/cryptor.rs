//! Symmetric payload encryption for the financing partner API.
//!
//! The partner exchanges application payloads as AES-256-CTR ciphertext: the
//! key is the SHA-256 digest of a shared secret, a random 16-byte IV is
//! generated per message and prepended to the ciphertext, and the whole blob
//! is transport-encoded.

use aes::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{GatewayError, Result};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Prepended IV length in bytes.
const IV_LEN: usize = 16;

/// Transport encoding of the IV-prefixed ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Standard base64.
    Base64,
    /// Lowercase hex.
    Hex,
}

/// AES-256-CTR payload cryptor keyed from a shared secret.
#[derive(Clone)]
pub struct PayloadCryptor {
    key: [u8; 32],
}

impl PayloadCryptor {
    /// Derives the AES key as the SHA-256 digest of the shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Encrypts a plaintext and returns the encoded IV-prefixed blob.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str, encoding: Encoding) -> String {
        let raw = self.encrypt_raw(plaintext.as_bytes());
        match encoding {
            Encoding::Base64 => {
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, raw)
            }
            Encoding::Hex => hex::encode(raw),
        }
    }

    /// Decrypts an encoded IV-prefixed blob back to a UTF-8 plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decryption`] if the encoding is invalid, the
    /// blob is shorter than one IV, or the plaintext is not UTF-8.
    pub fn decrypt(&self, encoded: &str, encoding: Encoding) -> Result<String> {
        let raw = match encoding {
            Encoding::Base64 => base64::Engine::decode(
                &base64::engine::general_purpose::STANDARD,
                encoded.trim(),
            )
            .map_err(|e| GatewayError::Decryption(format!("invalid base64: {e}")))?,
            Encoding::Hex => hex::decode(encoded.trim())
                .map_err(|e| GatewayError::Decryption(format!("invalid hex: {e}")))?,
        };
        let plaintext = self.decrypt_raw(&raw)?;
        String::from_utf8(plaintext)
            .map_err(|_| GatewayError::Decryption("plaintext is not valid UTF-8".to_owned()))
    }

    /// Encrypts raw bytes; the returned buffer is `IV || ciphertext`.
    #[must_use]
    pub fn encrypt_raw(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut buffer = Vec::with_capacity(IV_LEN + plaintext.len());
        buffer.extend_from_slice(&iv);
        buffer.extend_from_slice(plaintext);

        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut buffer[IV_LEN..]);
        buffer
    }

    /// Decrypts an `IV || ciphertext` buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decryption`] if the buffer is shorter than
    /// one IV.
    pub fn decrypt_raw(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < IV_LEN {
            return Err(GatewayError::Decryption(
                "ciphertext is shorter than the IV".to_owned(),
            ));
        }
        let (iv, ciphertext) = blob.split_at(IV_LEN);
        let mut iv_bytes = [0u8; IV_LEN];
        iv_bytes.copy_from_slice(iv);

        let mut plaintext = ciphertext.to_vec();
        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv_bytes.into());
        cipher.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }
}

impl std::fmt::Debug for PayloadCryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_base64() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let encrypted = cryptor.encrypt("application payload", Encoding::Base64);
        assert_eq!(cryptor.decrypt(&encrypted, Encoding::Base64).unwrap(), "application payload");
    }

    #[test]
    fn test_roundtrip_hex() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let encrypted = cryptor.encrypt("payload", Encoding::Hex);
        assert!(encrypted.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(cryptor.decrypt(&encrypted, Encoding::Hex).unwrap(), "payload");
    }

    #[test]
    fn test_roundtrip_utf8_and_empty() {
        let cryptor = PayloadCryptor::new("ключ");
        for payload in ["", "Поръчка №123 — фитнес уреди"] {
            let encrypted = cryptor.encrypt(payload, Encoding::Base64);
            assert_eq!(cryptor.decrypt(&encrypted, Encoding::Base64).unwrap(), payload);
        }
    }

    #[test]
    fn test_fresh_iv_per_message() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let first = cryptor.encrypt_raw(b"same payload");
        let second = cryptor.encrypt_raw(b"same payload");
        assert_ne!(first, second);
        assert_ne!(&first[..IV_LEN], &second[..IV_LEN]);
    }

    #[test]
    fn test_raw_roundtrip() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let blob = cryptor.encrypt_raw(&[0u8, 255, 1, 254]);
        assert_eq!(cryptor.decrypt_raw(&blob).unwrap(), vec![0u8, 255, 1, 254]);
    }

    #[test]
    fn test_truncated_blob_is_rejected() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let err = cryptor.decrypt_raw(&[0u8; IV_LEN - 1]).unwrap_err();
        assert!(matches!(err, GatewayError::Decryption(_)));
    }

    #[test]
    fn test_invalid_encoding_is_rejected() {
        let cryptor = PayloadCryptor::new("shared-secret");
        assert!(cryptor.decrypt("not base64 !!!", Encoding::Base64).is_err());
        assert!(cryptor.decrypt("zz", Encoding::Hex).is_err());
    }

    #[test]
    fn test_wrong_key_yields_garbage_not_plaintext() {
        let cryptor = PayloadCryptor::new("shared-secret");
        let other = PayloadCryptor::new("different-secret");
        let encrypted = cryptor.encrypt("application payload", Encoding::Base64);

        match other.decrypt(&encrypted, Encoding::Base64) {
            Ok(decrypted) => assert_ne!(decrypted, "application payload"),
            Err(e) => assert!(matches!(e, GatewayError::Decryption(_))),
        }
    }
}
