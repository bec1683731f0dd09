//! MAC signature generation for outbound payment requests.

use std::fmt;

use rsa::{pkcs1v15::SigningKey, RsaPrivateKey};
use sha1::Sha1;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer};

use crate::{
    borica::{keys, profile::DigestAlg},
    error::{GatewayError, Result},
};

/// Produces the gateway's `P_SIGN` value: an RSA PKCS#1 v1.5 signature over
/// a canonicalized MAC source string, rendered as uppercase hex.
///
/// The digest algorithm is fixed at construction by the gateway profile;
/// different protocol generations mandate different digests and the choice
/// is never made per call.
pub struct BoricaSigner {
    key: RsaPrivateKey,
    digest: DigestAlg,
}

impl BoricaSigner {
    /// Creates a signer from configured private key material.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Signing`] if the key material is unusable or
    /// the passphrase is missing or wrong. Callers must abort initiation on
    /// error; an unsigned request is never sent.
    pub fn new(
        private_key_material: &str,
        passphrase: Option<&str>,
        digest: DigestAlg,
    ) -> Result<Self> {
        let key = keys::load_private_key(private_key_material, passphrase)?;
        Ok(Self { key, digest })
    }

    /// Signs a canonicalized MAC source string.
    ///
    /// Returns the signature as uppercase hex, the exact `P_SIGN` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Signing`] if the signature cannot be
    /// produced.
    pub fn sign(&self, canonical: &str) -> Result<String> {
        let signature = match self.digest {
            DigestAlg::Sha1 => SigningKey::<Sha1>::new(self.key.clone())
                .try_sign(canonical.as_bytes())
                .map_err(|e| GatewayError::Signing(e.to_string()))?
                .to_vec(),
            DigestAlg::Sha256 => SigningKey::<Sha256>::new(self.key.clone())
                .try_sign(canonical.as_bytes())
                .map_err(|e| GatewayError::Signing(e.to_string()))?
                .to_vec(),
        };
        Ok(hex::encode_upper(signature))
    }
}

impl fmt::Debug for BoricaSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoricaSigner")
            .field("digest", &self.digest)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PKCS8: &str = include_str!("../../tests/data/test_pkcs8.pem");

    #[test]
    fn test_sign_produces_uppercase_hex() {
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, DigestAlg::Sha256).unwrap();
        let signature = signer.sign("8V540064111").unwrap();

        // 2048-bit RSA signature: 256 bytes, 512 hex characters
        assert_eq!(signature.len(), 512);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, signature.to_uppercase());
    }

    #[test]
    fn test_sign_is_deterministic_per_digest() {
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, DigestAlg::Sha256).unwrap();
        assert_eq!(signer.sign("payload").unwrap(), signer.sign("payload").unwrap());
    }

    #[test]
    fn test_digests_produce_different_signatures() {
        let sha1 = BoricaSigner::new(PRIVATE_PKCS8, None, DigestAlg::Sha1).unwrap();
        let sha256 = BoricaSigner::new(PRIVATE_PKCS8, None, DigestAlg::Sha256).unwrap();
        assert_ne!(sha1.sign("payload").unwrap(), sha256.sign("payload").unwrap());
    }

    #[test]
    fn test_unusable_key_is_rejected() {
        let err = BoricaSigner::new("garbage", None, DigestAlg::Sha256).unwrap_err();
        assert!(matches!(err, GatewayError::Signing(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, DigestAlg::Sha1).unwrap();
        let debug = format!("{signer:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("MII"));
    }
}
