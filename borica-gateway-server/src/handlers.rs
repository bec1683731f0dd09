//! HTTP handlers: thin parsing and error mapping over the library.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use borica_gateway::{
    borica::{CallbackFields, CallbackProcessor, OrderInput, PaymentInitiator},
    financing::{ApplicationData, FinancedItem, FinancingClient},
    store::WooCommerceStore,
    GatewayError,
};

/// Shared application state behind an `Arc`.
pub struct AppState {
    /// Signed request builder.
    pub initiator: PaymentInitiator,
    /// Verified callback processor writing to the order store.
    pub processor: CallbackProcessor<Arc<WooCommerceStore>>,
    /// Order store, used directly for financing order lookups.
    pub store: Arc<WooCommerceStore>,
    /// Financing partner client, when configured.
    pub financing: Option<FinancingClient>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

/// Maps library errors onto HTTP responses with non-sensitive bodies.
fn error_response(error: &GatewayError) -> Response {
    let (status, message) = match error {
        GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        GatewayError::VerificationFailed => {
            (StatusCode::BAD_REQUEST, "signature verification failed".to_owned())
        }
        GatewayError::Decryption(_) => {
            (StatusCode::BAD_REQUEST, "malformed payload".to_owned())
        }
        GatewayError::Configuration(_) | GatewayError::Signing(_) => {
            error!(%error, "internal gateway error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
        }
        GatewayError::Http(_) | GatewayError::Downstream(_) => {
            warn!(%error, "downstream failure");
            (StatusCode::BAD_GATEWAY, "downstream service unavailable".to_owned())
        }
    };
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Request body for `POST /api/payment/initiate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    /// Storefront order id.
    pub order_id: String,
    /// Amount in major units.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Description shown on the gateway page.
    pub description: String,
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Cardholder name.
    #[serde(default)]
    pub cardholder_name: Option<String>,
    /// Merchant token id.
    #[serde(default)]
    pub merchant_token: Option<String>,
}

/// `POST /api/payment/initiate`
pub async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitiateRequest>,
) -> Response {
    let order = OrderInput {
        order_id: request.order_id,
        amount: request.amount,
        currency: request.currency,
        description: request.description,
        customer_email: request.email,
        cardholder_name: request.cardholder_name,
        merchant_token: request.merchant_token,
    };

    match state.initiator.initiate(&order) {
        Ok(payment) => {
            let form_data: serde_json::Map<String, serde_json::Value> = payment
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            Json(json!({
                "success": true,
                "gatewayUrl": payment.gateway_url,
                "parameters": form_data,
                "formHtml": payment.form_html,
            }))
            .into_response()
        }
        Err(error) => error_response(&error),
    }
}

/// `POST /api/payment/callback` — the authoritative notification channel.
///
/// The gateway posts either a urlencoded form or JSON depending on the
/// integration revision; the body is sniffed rather than trusting the
/// content type.
pub async fn payment_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params = parse_callback_body(&headers, &body);
    let fields = CallbackFields::from_map(&params);

    match state.processor.process_notification(&fields).await {
        Ok(ack) => Json(ack).into_response(),
        Err(error) => error_response(&error),
    }
}

/// `GET /api/payment/callback` — advisory browser return; redirect only.
pub async fn payment_return(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    let fields = CallbackFields::from_map(&params);
    Redirect::to(&state.processor.process_return(&fields))
}

/// Decodes a notification body as JSON or urlencoded form parameters.
fn parse_callback_body(headers: &HeaderMap, body: &str) -> HashMap<String, String> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
        || body.trim_start().starts_with('{');

    if is_json {
        serde_json::from_str::<HashMap<String, serde_json::Value>>(body)
            .map(|map| {
                map.into_iter()
                    .map(|(k, v)| {
                        let value = match v {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, value)
                    })
                    .collect()
            })
            .unwrap_or_default()
    } else {
        url::form_urlencoded::parse(body.as_bytes()).into_owned().collect()
    }
}

/// Request body for `POST /api/financing/register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingRegisterRequest {
    /// Storefront order id to finance.
    pub order_id: String,
}

/// `POST /api/financing/register`
pub async fn register_financing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FinancingRegisterRequest>,
) -> Response {
    let Some(financing) = state.financing.as_ref() else {
        return error_response(&GatewayError::Configuration(
            "financing is not configured".to_owned(),
        ));
    };

    let result = async {
        let order = state.store.fetch_order(&request.order_id).await?;
        let currency =
            order.get("currency").and_then(|c| c.as_str()).unwrap_or("BGN").to_owned();
        let application = ApplicationData::from_woocommerce_order(&order, &currency)?;
        financing.register_application(&application).await
    }
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Request body for `POST /api/financing/register-product`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    /// Product id to finance.
    pub product_id: String,
    /// Quantity requested.
    pub quantity: u32,
    /// Variation id for variable products.
    #[serde(default)]
    pub variation_id: Option<String>,
}

/// `POST /api/financing/register-product` — pre-sale inquiry from a product
/// page, registered with the reserved order id `"0"`.
pub async fn register_product_financing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterProductRequest>,
) -> Response {
    let Some(financing) = state.financing.as_ref() else {
        return error_response(&GatewayError::Configuration(
            "financing is not configured".to_owned(),
        ));
    };

    let result = async {
        let product = state.store.fetch_product(&request.product_id).await?;
        let variation = match &request.variation_id {
            Some(variation_id) => Some(
                state.store.fetch_product_variation(&request.product_id, variation_id).await?,
            ),
            None => None,
        };
        let item = FinancedItem::from_woocommerce_product(
            &product,
            variation.as_ref(),
            request.quantity.max(1),
        )?;
        let application = ApplicationData::for_single_item(item, "EUR");
        financing.register_application(&application).await
    }
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Query for `GET /api/financing/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    /// Amount to quote, in major units.
    pub amount: Decimal,
    /// Fixed term; when present the quote is computed locally instead of
    /// fetching partner plans.
    #[serde(default)]
    pub months: Option<u32>,
}

/// `GET /api/financing/quote`
pub async fn financing_quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteQuery>,
) -> Response {
    if let Some(months) = query.months {
        return match borica_gateway::financing::monthly_payment(query.amount, months) {
            Ok(monthly) => Json(json!({
                "amount": query.amount,
                "months": months,
                "monthly": monthly,
            }))
            .into_response(),
            Err(error) => error_response(&error),
        };
    }

    let Some(financing) = state.financing.as_ref() else {
        return error_response(&GatewayError::Configuration(
            "financing is not configured".to_owned(),
        ));
    };
    match financing.fetch_installment_plans(query.amount).await {
        Ok(plans) => Json(plans).into_response(),
        Err(error) => error_response(&error),
    }
}
