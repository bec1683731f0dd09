//! Gateway protocol profiles.
//!
//! The gateway's signature scheme has evolved across protocol generations:
//! SHA-1 versus SHA-256 digests, plain versus length-prefixed
//! canonicalization, and amounts transmitted as integer minor units versus
//! decimal strings. A [`GatewayProfile`] bundles those choices into one
//! policy value selected once at startup per deployment, so the initiator
//! and the callback handler of a given deployment always agree.

use crate::borica::canonical::{CanonicalScheme, EmptyField};

/// Message digest used for the gateway MAC.
///
/// Fixed by the targeted gateway environment, not a per-call choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlg {
    /// SHA-1 (legacy protocol generation).
    Sha1,
    /// SHA-256 (current EMV 3-D Secure generation).
    Sha256,
}

/// Wire format of the `AMOUNT` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountFormat {
    /// Integer minor currency units (`49.99` is sent as `4999`).
    MinorUnits,
    /// Decimal major units with two fraction digits (`49.99`).
    Decimal,
}

/// Protocol fields that can appear in a MAC source string.
///
/// The request MAC covers a subset of these; the callback MAC covers the
/// full set. Order is defined by the profile, never by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacField {
    /// `ACTION` result code (callbacks only).
    Action,
    /// `RC` response code (callbacks only).
    ResponseCode,
    /// `APPROVAL` authorization code (callbacks only).
    Approval,
    /// `TERMINAL` merchant terminal id.
    Terminal,
    /// `TRTYPE` transaction type code.
    TransactionType,
    /// `AMOUNT` in the profile's wire format.
    Amount,
    /// `CURRENCY` ISO code.
    Currency,
    /// `ORDER` six-digit order number.
    Order,
    /// `RRN` retrieval reference number (callbacks only).
    Rrn,
    /// `INT_REF` internal reference (callbacks only).
    IntRef,
    /// `PARES_STATUS` 3-D Secure authentication status (callbacks only).
    ParesStatus,
    /// `ECI` e-commerce indicator (callbacks only).
    Eci,
    /// `TIMESTAMP` in `YYYYMMDDHHmmss` UTC.
    Timestamp,
    /// `NONCE` random hex token.
    Nonce,
    /// `MERCH_TOKEN_ID` merchant token.
    MerchantToken,
}

/// MAC field order for outbound payment-initiation requests.
const REQUEST_MAC_FIELDS: &[MacField] = &[
    MacField::Terminal,
    MacField::TransactionType,
    MacField::Amount,
    MacField::Currency,
    MacField::Order,
    MacField::Timestamp,
    MacField::Nonce,
    MacField::MerchantToken,
];

/// MAC field order for inbound callbacks.
const CALLBACK_MAC_FIELDS: &[MacField] = &[
    MacField::Action,
    MacField::ResponseCode,
    MacField::Approval,
    MacField::Terminal,
    MacField::TransactionType,
    MacField::Amount,
    MacField::Currency,
    MacField::Order,
    MacField::Rrn,
    MacField::IntRef,
    MacField::ParesStatus,
    MacField::Eci,
    MacField::Timestamp,
    MacField::Nonce,
    MacField::MerchantToken,
];

/// Signature-scheme policy for one gateway deployment.
///
/// Constructed once at startup (usually via [`GatewayProfile::legacy`] or
/// [`GatewayProfile::emv_3ds`]) and shared by the payment initiator and the
/// callback processor. Mismatched schemes between the two are a
/// silent-failure hazard, which is why the profile is a single value rather
/// than per-component settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayProfile {
    /// Digest algorithm for the MAC.
    pub digest: DigestAlg,
    /// Canonicalization scheme for MAC source strings.
    pub scheme: CanonicalScheme,
    /// Wire format of the `AMOUNT` field.
    pub amount_format: AmountFormat,
    /// Field order for the request MAC.
    pub request_mac_fields: &'static [MacField],
    /// Field order for the callback MAC.
    pub callback_mac_fields: &'static [MacField],
}

impl GatewayProfile {
    /// Legacy protocol generation: SHA-1 over a plain concatenation, amount
    /// as integer minor units.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            digest: DigestAlg::Sha1,
            scheme: CanonicalScheme::Plain,
            amount_format: AmountFormat::MinorUnits,
            request_mac_fields: REQUEST_MAC_FIELDS,
            callback_mac_fields: CALLBACK_MAC_FIELDS,
        }
    }

    /// Current EMV 3-D Secure generation: SHA-256 over a length-prefixed
    /// concatenation with `-` placeholders and a trailing `-` terminator,
    /// amount as a decimal string.
    #[must_use]
    pub const fn emv_3ds() -> Self {
        Self {
            digest: DigestAlg::Sha256,
            scheme: CanonicalScheme::LengthPrefixed {
                empty: EmptyField::Dash,
                trailing_dash: true,
            },
            amount_format: AmountFormat::Decimal,
            request_mac_fields: REQUEST_MAC_FIELDS,
            callback_mac_fields: CALLBACK_MAC_FIELDS,
        }
    }
}
