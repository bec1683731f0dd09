//! Outbound payment-initiation requests.
//!
//! Builds the full gateway parameter set for one checkout attempt, signs it
//! per the configured profile, and renders the auto-submitting redirect form
//! the browser POSTs to the gateway. Purely request construction; nothing is
//! persisted and the network round trip is deferred to the browser.

use chrono::Utc;
use rand::RngCore;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tracing::{info, instrument};

use crate::{
    borica::{
        profile::{AmountFormat, GatewayProfile, MacField},
        signer::BoricaSigner,
    },
    config::GatewayConfig,
    error::{GatewayError, Result},
};

/// Transaction type code for a sale.
pub const TRANSACTION_TYPE_SALE: &str = "1";

/// Maximum description length accepted by the gateway.
const MAX_DESCRIPTION_CHARS: usize = 125;

/// Gateway timestamp wire format: 14 characters, UTC.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One checkout attempt as supplied by the storefront.
#[derive(Debug, Clone)]
pub struct OrderInput {
    /// Storefront order identifier (numeric, up to six digits).
    pub order_id: String,
    /// Amount in major currency units.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Free-text description shown on the gateway page.
    pub description: String,
    /// Customer email, passed to the gateway when present.
    pub customer_email: Option<String>,
    /// Cardholder name for the 3-D Secure info blob.
    pub cardholder_name: Option<String>,
    /// Merchant token id, echoed back in callbacks.
    pub merchant_token: Option<String>,
}

/// A signed, ready-to-redirect payment request.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    /// Gateway endpoint the form POSTs to.
    pub gateway_url: String,
    /// All protocol parameters in form order, `P_SIGN` last.
    pub parameters: Vec<(String, String)>,
    /// Self-submitting hidden HTML form.
    pub form_html: String,
}

/// Builds and signs outbound payment requests.
#[derive(Debug)]
pub struct PaymentInitiator {
    terminal_id: String,
    merchant_name: String,
    merchant_url: String,
    backref_url: String,
    gateway_url: String,
    profile: GatewayProfile,
    signer: BoricaSigner,
}

impl PaymentInitiator {
    /// Creates an initiator from validated gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if required configuration is
    /// absent and [`GatewayError::Signing`] if the private key is unusable.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        if config.private_key.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "gateway private key is not configured".to_owned(),
            ));
        }
        let profile = config.profile.profile();
        let signer =
            BoricaSigner::new(&config.private_key, config.passphrase.as_deref(), profile.digest)?;
        Ok(Self {
            terminal_id: config.terminal_id.clone(),
            merchant_name: config.merchant_name.clone(),
            merchant_url: config.merchant_url.clone(),
            backref_url: config.backref_url.clone(),
            gateway_url: config.gateway_url.clone(),
            profile,
            signer,
        })
    }

    /// Validates the order, assembles the fixed-order parameter set with a
    /// fresh timestamp and nonce, signs it, and renders the redirect form.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for bad order data and
    /// [`GatewayError::Signing`] if the signature cannot be produced.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub fn initiate(&self, order: &OrderInput) -> Result<InitiatedPayment> {
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let nonce = generate_nonce();
        let payment = self.initiate_at(order, &timestamp, &nonce)?;
        info!(order_id = %order.order_id, "payment initiation signed");
        Ok(payment)
    }

    /// Deterministic core of [`PaymentInitiator::initiate`]; timestamp and
    /// nonce are injected so the assembly is testable.
    pub fn initiate_at(
        &self,
        order: &OrderInput,
        timestamp: &str,
        nonce: &str,
    ) -> Result<InitiatedPayment> {
        let order_number = normalize_order_id(&order.order_id)?;
        validate_order(order)?;
        let amount = format_amount(order.amount, self.profile.amount_format)?;
        let token = order.merchant_token.clone().unwrap_or_default();

        let mut parameters: Vec<(String, String)> = vec![
            ("TERMINAL".to_owned(), self.terminal_id.clone()),
            ("TRTYPE".to_owned(), TRANSACTION_TYPE_SALE.to_owned()),
            ("AMOUNT".to_owned(), amount.clone()),
            ("CURRENCY".to_owned(), order.currency.clone()),
            ("ORDER".to_owned(), order_number.clone()),
            ("DESC".to_owned(), order.description.clone()),
            ("MERCH_NAME".to_owned(), self.merchant_name.clone()),
            ("MERCH_URL".to_owned(), self.merchant_url.clone()),
            ("MERCHANT".to_owned(), self.terminal_id.clone()),
            ("EMAIL".to_owned(), order.customer_email.clone().unwrap_or_default()),
            ("TIMESTAMP".to_owned(), timestamp.to_owned()),
            ("NONCE".to_owned(), nonce.to_owned()),
            ("MERCH_TOKEN_ID".to_owned(), token.clone()),
            ("BACKREF".to_owned(), self.backref_url.clone()),
        ];
        if let Some(info) =
            cardholder_info(order.customer_email.as_deref(), order.cardholder_name.as_deref())
        {
            parameters.push(("M_INFO".to_owned(), info));
        }

        // The MAC covers the profile's fixed field order, never the form
        // order. Signature is computed last, over all other fields.
        let mac_values: Vec<&str> = self
            .profile
            .request_mac_fields
            .iter()
            .map(|field| match field {
                MacField::Terminal => self.terminal_id.as_str(),
                MacField::TransactionType => TRANSACTION_TYPE_SALE,
                MacField::Amount => amount.as_str(),
                MacField::Currency => order.currency.as_str(),
                MacField::Order => order_number.as_str(),
                MacField::Timestamp => timestamp,
                MacField::Nonce => nonce,
                MacField::MerchantToken => token.as_str(),
                // Callback-only fields never appear in a request MAC.
                _ => "",
            })
            .collect();
        let canonical = self.profile.scheme.canonicalize(&mac_values);
        let signature = self.signer.sign(&canonical)?;
        parameters.push(("P_SIGN".to_owned(), signature));

        let form_html = render_form(&self.gateway_url, &parameters);
        Ok(InitiatedPayment { gateway_url: self.gateway_url.clone(), parameters, form_html })
    }
}

/// Validates caller-supplied order data before any crypto work.
fn validate_order(order: &OrderInput) -> Result<()> {
    if order.amount <= Decimal::ZERO {
        return Err(GatewayError::Validation("amount must be positive".to_owned()));
    }
    if order.currency.len() != 3 || !order.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GatewayError::Validation(format!(
            "invalid currency code: {}",
            order.currency
        )));
    }
    if order.description.trim().is_empty() {
        return Err(GatewayError::Validation("description is required".to_owned()));
    }
    if order.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(GatewayError::Validation(format!(
            "description exceeds {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

/// Normalizes a storefront order id to the gateway's six-digit `ORDER`
/// convention: digits only, left-padded with zeros.
pub(crate) fn normalize_order_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(GatewayError::Validation("order id is required".to_owned()));
    }
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(GatewayError::Validation(format!("order id is not numeric: {id}")));
    }
    if id.len() > 6 {
        return Err(GatewayError::Validation(format!(
            "order id exceeds six digits: {id}"
        )));
    }
    Ok(format!("{id:0>6}"))
}

/// Formats an amount for the wire per the profile's convention.
fn format_amount(amount: Decimal, format: AmountFormat) -> Result<String> {
    match format {
        AmountFormat::MinorUnits => {
            let cents = amount
                .checked_mul(Decimal::ONE_HUNDRED)
                .map(|c| c.round())
                .and_then(|c| c.to_i64())
                .ok_or_else(|| {
                    GatewayError::Validation(format!("amount out of range: {amount}"))
                })?;
            Ok(cents.to_string())
        }
        AmountFormat::Decimal => Ok(format!("{:.2}", amount.round_dp(2))),
    }
}

/// Generates a fresh 32-character uppercase hex nonce.
///
/// One nonce per request, never reused; replay protection depends on it.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Builds the base64 cardholder-info blob (`M_INFO`).
fn cardholder_info(email: Option<&str>, name: Option<&str>) -> Option<String> {
    let mut info = serde_json::Map::new();
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        info.insert("email".to_owned(), serde_json::Value::String(email.to_owned()));
    }
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        info.insert("cardholderName".to_owned(), serde_json::Value::String(name.to_owned()));
    }
    if info.is_empty() {
        return None;
    }
    let json = serde_json::Value::Object(info).to_string();
    Some(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, json))
}

/// Minimal HTML attribute escaping for form values.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the self-submitting hidden form POSTing to the gateway.
fn render_form(action_url: &str, parameters: &[(String, String)]) -> String {
    let inputs: String = parameters
        .iter()
        .map(|(name, value)| {
            format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(name),
                escape_html(value)
            )
        })
        .collect();

    format!(
        "<form id=\"borica-form\" action=\"{}\" method=\"POST\" style=\"display: none;\">\n{}</form>\n\
         <script>document.getElementById('borica-form').submit();</script>\n",
        escape_html(action_url),
        inputs
    )
}
