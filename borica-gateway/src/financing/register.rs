//! Financing application registration and installment quotes.

use std::{fmt, time::Duration};

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    config::FinancingConfig,
    error::{GatewayError, Result},
    financing::cryptor::{Encoding, PayloadCryptor},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery address carried in a financing application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryAddress {
    /// City name.
    pub city: String,
    /// Street address line.
    pub address: String,
    /// Postal code.
    pub postcode: String,
}

/// One financed line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancedItem {
    /// Item name.
    pub name: String,
    /// Item description.
    pub description: String,
    /// Quantity ordered.
    pub qty: u32,
    /// Unit price in major units.
    pub price: Decimal,
    /// Stock keeping unit, or `"shipping"` for the delivery line.
    pub sku: String,
    /// Partner category code.
    pub category: String,
    /// Product image URL.
    pub imagelink: String,
}

impl FinancedItem {
    /// Builds a financed item from a WooCommerce product document, with an
    /// optional variation overriding name, price, and image.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the product has no name or
    /// no parseable price.
    pub fn from_woocommerce_product(
        product: &serde_json::Value,
        variation: Option<&serde_json::Value>,
        qty: u32,
    ) -> Result<Self> {
        let name = product
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GatewayError::Validation("product has no name".to_owned()))?;
        let mut item = Self {
            name: name.to_owned(),
            description: String::new(),
            qty,
            price: product
                .get("price")
                .and_then(json_decimal)
                .ok_or_else(|| GatewayError::Validation("product has no price".to_owned()))?,
            sku: product.get("sku").and_then(|s| s.as_str()).unwrap_or_default().to_owned(),
            category: String::new(),
            imagelink: product
                .get("images")
                .and_then(|imgs| imgs.get(0))
                .and_then(|img| img.get("src"))
                .and_then(|src| src.as_str())
                .unwrap_or_default()
                .to_owned(),
        };

        if let Some(variation) = variation {
            if let Some(vname) = variation.get("name").and_then(|n| n.as_str()) {
                item.name = format!("{} - {vname}", item.name);
            }
            if let Some(price) = variation.get("price").and_then(json_decimal) {
                item.price = price;
            }
            if let Some(src) =
                variation.get("image").and_then(|img| img.get("src")).and_then(|s| s.as_str())
            {
                item.imagelink = src.to_owned();
            }
        }
        Ok(item)
    }
}

/// The plaintext financing application, serialized and encrypted before
/// transmission. Field names follow the partner's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationData {
    /// Storefront order id.
    pub orderid: String,
    /// Applicant first name.
    pub firstname: String,
    /// Applicant last name.
    pub lastname: String,
    /// Applicant email.
    pub email: String,
    /// Applicant phone.
    pub phone: String,
    /// Delivery address.
    pub deliveryaddress: DeliveryAddress,
    /// Financed items including the shipping line.
    pub items: Vec<FinancedItem>,
    /// ISO currency code.
    pub currency: String,
}

impl ApplicationData {
    /// Builds a pre-sale application for a single product, before any order
    /// exists. The reserved order id `"0"` and empty applicant fields tell
    /// the partner this is a product-page inquiry, not a checkout.
    #[must_use]
    pub fn for_single_item(item: FinancedItem, currency: &str) -> Self {
        Self {
            orderid: "0".to_owned(),
            firstname: String::new(),
            lastname: String::new(),
            email: String::new(),
            phone: String::new(),
            deliveryaddress: DeliveryAddress::default(),
            items: vec![item],
            currency: currency.to_owned(),
        }
    }

    /// Builds an application from a WooCommerce order document.
    ///
    /// Line items become financed items; shipping lines are appended with
    /// the reserved `"shipping"` SKU so the partner prices the full order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the document lacks an order
    /// id or billing block.
    pub fn from_woocommerce_order(order: &serde_json::Value, currency: &str) -> Result<Self> {
        let order_id = order
            .get("id")
            .and_then(|id| id.as_i64().map(|n| n.to_string()).or_else(|| {
                id.as_str().map(str::to_owned)
            }))
            .ok_or_else(|| GatewayError::Validation("order document has no id".to_owned()))?;
        let billing = order
            .get("billing")
            .filter(|b| b.is_object())
            .ok_or_else(|| GatewayError::Validation("order document has no billing".to_owned()))?;
        let text = |v: &serde_json::Value, key: &str| {
            v.get(key).and_then(|s| s.as_str()).unwrap_or_default().to_owned()
        };

        let mut items: Vec<FinancedItem> = order
            .get("line_items")
            .and_then(|v| v.as_array())
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| FinancedItem {
                        name: text(line, "name"),
                        description: text(line, "name"),
                        qty: line.get("quantity").and_then(|q| q.as_u64()).unwrap_or(1) as u32,
                        price: line
                            .get("price")
                            .and_then(json_decimal)
                            .unwrap_or(Decimal::ZERO),
                        sku: text(line, "sku"),
                        category: String::new(),
                        imagelink: line
                            .get("image")
                            .map(|img| text(img, "src"))
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(shipping) = order.get("shipping_lines").and_then(|v| v.as_array()) {
            for line in shipping {
                let price = line.get("total").and_then(json_decimal).unwrap_or(Decimal::ZERO);
                if price > Decimal::ZERO {
                    items.push(FinancedItem {
                        name: text(line, "method_title"),
                        description: text(line, "method_title"),
                        qty: 1,
                        price,
                        sku: "shipping".to_owned(),
                        category: String::new(),
                        imagelink: String::new(),
                    });
                }
            }
        }

        Ok(Self {
            orderid: order_id,
            firstname: text(billing, "first_name"),
            lastname: text(billing, "last_name"),
            email: text(billing, "email"),
            phone: text(billing, "phone"),
            deliveryaddress: DeliveryAddress {
                city: text(billing, "city"),
                address: text(billing, "address_1"),
                postcode: text(billing, "postcode"),
            },
            items,
            currency: currency.to_owned(),
        })
    }
}

/// Per-month amount for an even installment split, rounded to cents.
///
/// Used by the storefront's installment calculator when no partner quote is
/// requested.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for a non-positive price or zero
/// months.
pub fn monthly_payment(price: Decimal, months: u32) -> Result<Decimal> {
    if price <= Decimal::ZERO {
        return Err(GatewayError::Validation("price must be positive".to_owned()));
    }
    if months == 0 {
        return Err(GatewayError::Validation("months must be positive".to_owned()));
    }
    Ok((price / Decimal::from(months)).round_dp(2))
}

/// Decimal from a JSON number or numeric string.
fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Client for the financing partner's reseller API.
pub struct FinancingClient {
    client: Client,
    api_url: String,
    reseller_code: String,
    reseller_key: String,
    cryptor: PayloadCryptor,
}

impl FinancingClient {
    /// Creates a client with a pooled HTTP connection and a cryptor keyed
    /// from the configured shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the client cannot be
    /// built.
    pub fn new(config: &FinancingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            reseller_code: config.reseller_code.clone(),
            reseller_key: config.reseller_key.clone(),
            cryptor: PayloadCryptor::new(&config.encryption_key),
        })
    }

    /// Serializes, encrypts, and submits a financing application.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] for non-success responses and
    /// [`GatewayError::Http`] for transport failures.
    #[instrument(skip(self, application), fields(order = %application.orderid))]
    pub async fn register_application(
        &self,
        application: &ApplicationData,
    ) -> Result<serde_json::Value> {
        let plaintext = serde_json::to_string(application)
            .map_err(|e| GatewayError::Validation(format!("unserializable application: {e}")))?;
        let data = self.cryptor.encrypt(&plaintext, Encoding::Base64);

        let response = self
            .client
            .post(format!("{}/RegisterApplication", self.api_url))
            .json(&serde_json::json!({
                "reseller_code": self.reseller_code,
                "reseller_key": self.reseller_key,
                "data": data,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Downstream(format!(
                "application registration returned {status}"
            )));
        }
        info!(order = %application.orderid, "financing application registered");
        Ok(response.json().await?)
    }

    /// Fetches installment plan quotes for an amount.
    ///
    /// The partner returns a JSON array of plans; any other shape maps to an
    /// empty array rather than an error, matching the quote endpoint's
    /// advisory role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] for non-success responses and
    /// [`GatewayError::Http`] for transport failures.
    #[instrument(skip(self))]
    pub async fn fetch_installment_plans(&self, amount: Decimal) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/GetCalculations", self.api_url))
            .query(&[
                ("reseller_code", self.reseller_code.as_str()),
                ("reseller_key", self.reseller_key.as_str()),
                ("amount", &format!("{:.2}", amount.round_dp(2))),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Downstream(format!("quote request returned {status}")));
        }
        let body: serde_json::Value = response.json().await?;
        if body.is_array() {
            Ok(body)
        } else {
            debug!("quote response was not an array, returning no plans");
            Ok(serde_json::Value::Array(Vec::new()))
        }
    }
}

impl fmt::Debug for FinancingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinancingClient")
            .field("api_url", &self.api_url)
            .field("reseller_code", &self.reseller_code)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_order() -> serde_json::Value {
        json!({
            "id": 123,
            "billing": {
                "first_name": "Иван",
                "last_name": "Петров",
                "email": "ivan@example.com",
                "phone": "+359888123456",
                "city": "София",
                "address_1": "бул. Витоша 1",
                "postcode": "1000",
            },
            "line_items": [
                {
                    "name": "Лежанка за тренировка",
                    "quantity": 2,
                    "price": "249.90",
                    "sku": "BENCH-01",
                    "image": { "src": "https://shop.example.com/bench.jpg" },
                },
            ],
            "shipping_lines": [
                { "method_title": "Куриер", "total": "9.90" },
            ],
        })
    }

    #[test]
    fn test_application_from_order() {
        let app = ApplicationData::from_woocommerce_order(&sample_order(), "BGN").unwrap();

        assert_eq!(app.orderid, "123");
        assert_eq!(app.firstname, "Иван");
        assert_eq!(app.deliveryaddress.city, "София");
        assert_eq!(app.currency, "BGN");
        assert_eq!(app.items.len(), 2);
        assert_eq!(app.items[0].sku, "BENCH-01");
        assert_eq!(app.items[0].qty, 2);
        assert_eq!(app.items[0].price, Decimal::new(24990, 2));
    }

    #[test]
    fn test_shipping_line_uses_reserved_sku() {
        let app = ApplicationData::from_woocommerce_order(&sample_order(), "BGN").unwrap();
        let shipping = app.items.last().unwrap();
        assert_eq!(shipping.sku, "shipping");
        assert_eq!(shipping.price, Decimal::new(990, 2));
        assert_eq!(shipping.qty, 1);
    }

    #[test]
    fn test_free_shipping_is_omitted() {
        let mut order = sample_order();
        order["shipping_lines"][0]["total"] = json!("0.00");
        let app = ApplicationData::from_woocommerce_order(&order, "BGN").unwrap();
        assert_eq!(app.items.len(), 1);
    }

    #[test]
    fn test_order_without_id_is_rejected() {
        let err = ApplicationData::from_woocommerce_order(&json!({ "billing": {} }), "BGN")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn test_application_roundtrips_through_cryptor() {
        let app = ApplicationData::from_woocommerce_order(&sample_order(), "BGN").unwrap();
        let cryptor = PayloadCryptor::new("shared-secret");

        let encrypted = cryptor.encrypt(&serde_json::to_string(&app).unwrap(), Encoding::Base64);
        let decrypted: ApplicationData =
            serde_json::from_str(&cryptor.decrypt(&encrypted, Encoding::Base64).unwrap()).unwrap();
        assert_eq!(decrypted.orderid, "123");
        assert_eq!(decrypted.items.len(), 2);
    }

    fn sample_product() -> serde_json::Value {
        json!({
            "id": 456,
            "name": "Велоергометър",
            "price": "599.00",
            "sku": "BIKE-01",
            "images": [{ "src": "https://shop.example.com/bike.jpg" }],
        })
    }

    #[test]
    fn test_item_from_product() {
        let item = FinancedItem::from_woocommerce_product(&sample_product(), None, 2).unwrap();
        assert_eq!(item.name, "Велоергометър");
        assert_eq!(item.qty, 2);
        assert_eq!(item.price, Decimal::new(59900, 2));
        assert_eq!(item.sku, "BIKE-01");
        assert_eq!(item.imagelink, "https://shop.example.com/bike.jpg");
    }

    #[test]
    fn test_variation_overrides_name_price_and_image() {
        let variation = json!({
            "id": 457,
            "name": "Черен",
            "price": "649.00",
            "image": { "src": "https://shop.example.com/bike-black.jpg" },
        });
        let item =
            FinancedItem::from_woocommerce_product(&sample_product(), Some(&variation), 1).unwrap();
        assert_eq!(item.name, "Велоергометър - Черен");
        assert_eq!(item.price, Decimal::new(64900, 2));
        assert_eq!(item.imagelink, "https://shop.example.com/bike-black.jpg");
    }

    #[test]
    fn test_product_without_name_or_price_is_rejected() {
        assert!(FinancedItem::from_woocommerce_product(&json!({"price": "1.00"}), None, 1).is_err());
        assert!(FinancedItem::from_woocommerce_product(
            &json!({"name": "Уред", "price": ""}),
            None,
            1
        )
        .is_err());
    }

    #[test]
    fn test_single_item_application_is_a_pre_sale_inquiry() {
        let item = FinancedItem::from_woocommerce_product(&sample_product(), None, 1).unwrap();
        let app = ApplicationData::for_single_item(item, "EUR");

        assert_eq!(app.orderid, "0");
        assert!(app.firstname.is_empty());
        assert!(app.email.is_empty());
        assert_eq!(app.items.len(), 1);
        assert_eq!(app.currency, "EUR");
    }

    #[test]
    fn test_monthly_payment_rounds_to_cents() {
        assert_eq!(monthly_payment(Decimal::new(49990, 2), 12).unwrap(), Decimal::new(4166, 2));
        assert_eq!(monthly_payment(Decimal::from(600), 6).unwrap(), Decimal::from(100));
        assert!(monthly_payment(Decimal::ZERO, 12).is_err());
        assert!(monthly_payment(Decimal::from(100), 0).is_err());
    }

    #[test]
    fn test_debug_redacts_reseller_key() {
        let client = FinancingClient::new(&FinancingConfig {
            api_url: "https://api.partner.example/v1/".to_owned(),
            reseller_code: "LF001".to_owned(),
            reseller_key: "super-secret-key".to_owned(),
            encryption_key: "encryption-secret".to_owned(),
        })
        .unwrap();

        let debug = format!("{client:?}");
        assert!(debug.contains("LF001"));
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("encryption-secret"));
    }
}
