//! Inbound callback verification and interpretation.
//!
//! The gateway reports outcomes on two channels: a server-to-server POST
//! notification and a browser GET return through the `BACKREF` URL. Only the
//! POST channel is authoritative. The notification handler verifies the
//! signature, interprets the response code, and records the outcome in the
//! order store; the browser return is advisory and only produces a redirect,
//! it never mutates any order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    borica::{
        profile::{AmountFormat, GatewayProfile, MacField},
        verifier::BoricaVerifier,
    },
    config::GatewayConfig,
    error::{GatewayError, Result},
    store::{OrderStatus, OrderStatusUpdate, OrderStore},
};

/// Response code for an approved transaction.
const RC_APPROVED: i32 = 0;

/// Customer-facing messages for the gateway's decline codes, in Bulgarian.
const DECLINE_MESSAGES: &[(i32, &str)] = &[
    (-1, "Системна грешка"),
    (-2, "Невалидни данни"),
    (-17, "Невалиден подпис или изтекла заявка"),
    (-19, "Грешка при автентикация"),
    (-25, "Потребителят отказа плащането"),
];

const MESSAGE_APPROVED: &str = "Плащането е завършено успешно";
const MESSAGE_FALLBACK: &str = "Възникна грешка при плащането";

/// Raw callback parameters, one value per protocol field.
///
/// All fields are kept as the gateway sent them; absent parameters become
/// empty strings so the MAC source can be rebuilt byte-exactly.
#[derive(Debug, Clone, Default)]
pub struct CallbackFields {
    /// `ACTION` result code.
    pub action: String,
    /// `RC` response code.
    pub response_code: String,
    /// `APPROVAL` authorization code.
    pub approval: String,
    /// `TERMINAL` merchant terminal id.
    pub terminal: String,
    /// `TRTYPE` transaction type.
    pub transaction_type: String,
    /// `AMOUNT` as transmitted.
    pub amount: String,
    /// `CURRENCY` ISO code.
    pub currency: String,
    /// `ORDER` six-digit order number.
    pub order: String,
    /// `RRN` retrieval reference number.
    pub rrn: String,
    /// `INT_REF` internal reference.
    pub int_ref: String,
    /// `PARES_STATUS` 3-D Secure authentication status.
    pub pares_status: String,
    /// `ECI` e-commerce indicator.
    pub eci: String,
    /// `TIMESTAMP` as transmitted.
    pub timestamp: String,
    /// `NONCE` echoed from the request.
    pub nonce: String,
    /// `MERCH_TOKEN_ID` echoed merchant token.
    pub merchant_token: String,
    /// `P_SIGN` hex signature.
    pub signature: String,
    /// `STATUSMSG` optional human-readable status from the gateway.
    pub status_message: Option<String>,
}

impl CallbackFields {
    /// Builds callback fields from decoded form or query parameters.
    ///
    /// Lenient by design: unknown keys are ignored and missing keys map to
    /// empty values. Rejection happens at verification, not parsing.
    #[must_use]
    pub fn from_map(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).cloned().unwrap_or_default();
        Self {
            action: get("ACTION"),
            response_code: get("RC"),
            approval: get("APPROVAL"),
            terminal: get("TERMINAL"),
            transaction_type: get("TRTYPE"),
            amount: get("AMOUNT"),
            currency: get("CURRENCY"),
            order: get("ORDER"),
            rrn: get("RRN"),
            int_ref: get("INT_REF"),
            pares_status: get("PARES_STATUS"),
            eci: get("ECI"),
            timestamp: get("TIMESTAMP"),
            nonce: get("NONCE"),
            merchant_token: get("MERCH_TOKEN_ID"),
            signature: get("P_SIGN"),
            status_message: params.get("STATUSMSG").cloned().filter(|s| !s.is_empty()),
        }
    }

    /// Value of one MAC field as transmitted.
    fn mac_value(&self, field: MacField) -> &str {
        match field {
            MacField::Action => &self.action,
            MacField::ResponseCode => &self.response_code,
            MacField::Approval => &self.approval,
            MacField::Terminal => &self.terminal,
            MacField::TransactionType => &self.transaction_type,
            MacField::Amount => &self.amount,
            MacField::Currency => &self.currency,
            MacField::Order => &self.order,
            MacField::Rrn => &self.rrn,
            MacField::IntRef => &self.int_ref,
            MacField::ParesStatus => &self.pares_status,
            MacField::Eci => &self.eci,
            MacField::Timestamp => &self.timestamp,
            MacField::Nonce => &self.nonce,
            MacField::MerchantToken => &self.merchant_token,
        }
    }

    /// Parses `RC` as a signed integer; `None` when absent or malformed.
    #[must_use]
    pub fn parse_response_code(&self) -> Option<i32> {
        self.response_code.trim().parse().ok()
    }
}

/// Customer-facing message for a response code.
///
/// Known codes always map through the built-in Bulgarian table; a
/// gateway-supplied `STATUSMSG` is consulted only for codes the table does
/// not know, with a generic message as the last resort. Never empty.
#[must_use]
pub fn response_message(rc: Option<i32>, status_message: Option<&str>) -> String {
    match rc {
        Some(RC_APPROVED) => return MESSAGE_APPROVED.to_owned(),
        Some(code) => {
            if let Some((_, msg)) = DECLINE_MESSAGES.iter().find(|(known, _)| *known == code) {
                return (*msg).to_owned();
            }
        }
        None => {}
    }
    status_message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| MESSAGE_FALLBACK.to_owned(), str::to_owned)
}

/// Acknowledgement returned to the gateway after a processed notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAck {
    /// Whether the notification was accepted and processed. Always `true`
    /// in an `Ok` ack; the payment outcome is carried by `status`.
    pub success: bool,
    /// Order number as transmitted by the gateway.
    pub order_id: String,
    /// Recorded order status.
    pub status: OrderStatus,
}

/// Verifies and applies gateway callbacks.
///
/// Generic over the order store so the notification path is testable without
/// a live storefront.
#[derive(Debug)]
pub struct CallbackProcessor<S> {
    verifier: BoricaVerifier,
    profile: GatewayProfile,
    store: S,
    test_mode: bool,
}

impl<S: OrderStore> CallbackProcessor<S> {
    /// Creates a processor from validated gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the verification key
    /// cannot be parsed.
    pub fn new(config: &GatewayConfig, store: S) -> Result<Self> {
        let profile = config.profile.profile();
        let verifier = BoricaVerifier::new(&config.public_key, profile)?;
        Ok(Self { verifier, profile, store, test_mode: config.test_mode })
    }

    /// Processes an authoritative server-to-server notification.
    ///
    /// Verifies the signature over the profile's callback field order,
    /// interprets the response code, and records the outcome. A store
    /// failure is logged and swallowed so the gateway still receives an
    /// acknowledgement and redelivers later if it chooses; redelivery is
    /// safe because the status write is an idempotent upsert.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::VerificationFailed`] on a bad signature.
    /// Nothing is written to the store in that case.
    #[instrument(skip(self, fields), fields(order = %fields.order, rc = %fields.response_code))]
    pub async fn process_notification(&self, fields: &CallbackFields) -> Result<CallbackAck> {
        if !self.verify(fields) {
            warn!(order = %fields.order, "callback rejected: signature verification failed");
            return Err(GatewayError::VerificationFailed);
        }

        let rc = fields.parse_response_code();
        let approved = rc == Some(RC_APPROVED);
        let status = if approved { OrderStatus::Completed } else { OrderStatus::Failed };
        let update = OrderStatusUpdate {
            status,
            transaction_id: non_empty(&fields.rrn),
            approval: non_empty(&fields.approval),
            internal_ref: non_empty(&fields.int_ref),
            amount: parse_amount(&fields.amount, self.profile.amount_format),
            currency: non_empty(&fields.currency),
            response_code: rc,
            status_message: Some(response_message(rc, fields.status_message.as_deref())),
            gateway_timestamp: non_empty(&fields.timestamp),
        };

        if let Err(e) = self.store.update_status(&fields.order, &update).await {
            warn!(order = %fields.order, error = %e, "order store update failed");
        } else {
            info!(order = %fields.order, status = ?status, "order status recorded");
        }

        Ok(CallbackAck { success: true, order_id: fields.order.clone(), status })
    }

    /// Interprets a browser return and builds the storefront redirect URL.
    ///
    /// The browser channel is advisory: it never writes to the order store
    /// and the displayed outcome is derived from `RC` alone, without a
    /// signature check. The authoritative, verified outcome arrives on the
    /// notification channel.
    #[must_use]
    pub fn process_return(&self, fields: &CallbackFields) -> String {
        let rc = fields.parse_response_code();
        let success = rc == Some(RC_APPROVED);
        let message = response_message(rc, fields.status_message.as_deref());

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("order", &fields.order)
            .append_pair("success", if success { "true" } else { "false" })
            .append_pair("message", &message)
            .append_pair("rc", fields.response_code.trim())
            .finish();
        format!("/payment-result?{query}")
    }

    fn verify(&self, fields: &CallbackFields) -> bool {
        if self.test_mode {
            // Test environments sign with throwaway keys; the signature is
            // still required to be present.
            return !fields.signature.trim().is_empty();
        }
        let values: Vec<&str> =
            self.profile.callback_mac_fields.iter().map(|f| fields.mac_value(*f)).collect();
        self.verifier.verify(&values, &fields.signature)
    }
}

/// Parses the transmitted amount back into major units per the profile.
fn parse_amount(raw: &str, format: AmountFormat) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match format {
        AmountFormat::MinorUnits => {
            raw.parse::<i64>().ok().map(|cents| Decimal::new(cents, 2))
        }
        AmountFormat::Decimal => raw.parse().ok(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_owned()) }
}
