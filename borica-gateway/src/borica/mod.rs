//! Card gateway protocol implementation.
//!
//! The gateway exchange is form-based: the merchant signs an ordered set of
//! request fields and redirects the browser to the gateway; the gateway
//! reports the outcome on a signed server-to-server notification plus an
//! advisory browser return. This module owns every protocol concern:
//! canonicalization ([`canonical`]), the per-generation signature policy
//! ([`profile`]), key loading ([`keys`]), signing ([`signer`]) and
//! verification ([`verifier`]), request assembly ([`initiate`]), and
//! callback interpretation ([`callback`]).

pub mod callback;
pub mod canonical;
pub mod initiate;
pub(crate) mod keys;
pub mod profile;
pub mod signer;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use callback::{response_message, CallbackAck, CallbackFields, CallbackProcessor};
pub use canonical::{CanonicalScheme, EmptyField};
pub use initiate::{InitiatedPayment, OrderInput, PaymentInitiator};
pub use profile::{AmountFormat, DigestAlg, GatewayProfile, MacField};
pub use signer::BoricaSigner;
pub use verifier::BoricaVerifier;
