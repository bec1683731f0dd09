//! MAC signature verification for inbound callbacks.

use std::fmt;

use rsa::{
    pkcs1v15::{Signature, VerifyingKey},
    RsaPublicKey,
};
use sha1::Sha1;
use sha2::Sha256;
use signature::Verifier;
use tracing::debug;

use crate::{
    borica::{keys, profile::GatewayProfile},
    error::{GatewayError, Result},
};

/// Verifies the gateway's `P_SIGN` over inbound callback fields.
///
/// The verifier rebuilds the canonical string with the exact scheme and
/// digest of the configured [`GatewayProfile`], so a deployment's verifier
/// always matches its initiator.
///
/// Verification is fail-closed: [`BoricaVerifier::verify`] never panics and
/// never surfaces an error. Any failure while decoding the signature or
/// running the verification maps to `false` (reject).
pub struct BoricaVerifier {
    key: RsaPublicKey,
    profile: GatewayProfile,
}

impl BoricaVerifier {
    /// Creates a verifier from configured public key or certificate
    /// material.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the key material cannot be
    /// parsed. Construction fails loudly; per-callback verification does
    /// not.
    pub fn new(public_key_material: &str, profile: GatewayProfile) -> Result<Self> {
        let key = keys::load_public_key(public_key_material)?;
        Ok(Self { key, profile })
    }

    /// Checks a hex signature against an ordered list of MAC field values.
    ///
    /// Returns `true` only if the signature matches the canonicalized
    /// fields under the profile's digest. Malformed input of any kind
    /// returns `false`.
    #[must_use]
    pub fn verify(&self, fields: &[&str], hex_signature: &str) -> bool {
        match self.try_verify(fields, hex_signature) {
            Ok(()) => true,
            Err(e) => {
                // Operator diagnostics only; the caller just sees a reject.
                debug!(error = %e, "callback signature rejected");
                false
            }
        }
    }

    fn try_verify(&self, fields: &[&str], hex_signature: &str) -> Result<()> {
        let canonical = self.profile.scheme.canonicalize(fields);

        let signature_bytes =
            hex::decode(hex_signature.trim()).map_err(|_| GatewayError::VerificationFailed)?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| GatewayError::VerificationFailed)?;

        let verified = match self.profile.digest {
            crate::borica::profile::DigestAlg::Sha1 => {
                VerifyingKey::<Sha1>::new(self.key.clone())
                    .verify(canonical.as_bytes(), &signature)
            }
            crate::borica::profile::DigestAlg::Sha256 => {
                VerifyingKey::<Sha256>::new(self.key.clone())
                    .verify(canonical.as_bytes(), &signature)
            }
        };

        verified.map_err(|_| GatewayError::VerificationFailed)
    }
}

impl fmt::Debug for BoricaVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoricaVerifier").field("profile", &self.profile).finish_non_exhaustive()
    }
}
