//! Error types for the gateway integration core.
//!
//! All errors implement the standard [`std::error::Error`] trait via
//! [`thiserror::Error`]. Variants map onto the failure taxonomy of the
//! payment flow: caller input, server configuration, cryptography, and
//! downstream collaborators. Error messages are safe to return to callers;
//! they never carry key material, passphrases, or store credentials.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur in the gateway integration core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing caller input (bad order id, non-positive amount).
    ///
    /// Rejected before any network or crypto work happens.
    #[error("invalid payment request: {0}")]
    Validation(String),

    /// Missing or unusable server-side configuration (absent private key,
    /// bad gateway URL). Never degraded into an insecure fallback.
    #[error("gateway configuration error: {0}")]
    Configuration(String),

    /// The signing key is unusable or the signature could not be produced.
    /// Initiation is aborted; an unsigned request is never sent.
    #[error("signature generation failed: {0}")]
    Signing(String),

    /// An inbound callback failed signature verification.
    ///
    /// Deliberately carries no detail: the caller must not learn why
    /// verification failed.
    #[error("callback signature verification failed")]
    VerificationFailed,

    /// Malformed ciphertext in the financing payload cryptor.
    #[error("payload decryption failed: {0}")]
    Decryption(String),

    /// HTTP transport failure talking to a downstream collaborator
    /// (order store or financing partner).
    #[error("downstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A downstream collaborator answered with a non-success status.
    #[error("downstream service error: {0}")]
    Downstream(String),
}
