//! WooCommerce REST backend for the order store.

use std::{fmt, time::Duration};

use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    config::StoreConfig,
    error::{GatewayError, Result},
    store::{OrderStatusUpdate, OrderStore},
};

use async_trait::async_trait;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Order store backed by the WooCommerce REST API v3.
///
/// Authenticates with consumer key/secret over HTTPS basic auth and writes
/// status transitions plus gateway metadata to the order. The same update
/// applied twice converges to the same order state, which makes callback
/// redelivery safe.
pub struct WooCommerceStore {
    client: Client,
    api_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl WooCommerceStore {
    /// Creates a store with a pooled HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the client cannot be
    /// built.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
        })
    }

    /// Fetches the full order document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] for non-success responses and
    /// [`GatewayError::Http`] for transport failures.
    #[instrument(skip(self))]
    pub async fn fetch_order(&self, order_id: &str) -> Result<serde_json::Value> {
        self.fetch_json(&format!("{}/orders/{order_id}", self.api_url), "order fetch").await
    }

    /// Fetches a product document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] for non-success responses and
    /// [`GatewayError::Http`] for transport failures.
    #[instrument(skip(self))]
    pub async fn fetch_product(&self, product_id: &str) -> Result<serde_json::Value> {
        self.fetch_json(&format!("{}/products/{product_id}", self.api_url), "product fetch")
            .await
    }

    /// Fetches one variation of a variable product.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] for non-success responses and
    /// [`GatewayError::Http`] for transport failures.
    #[instrument(skip(self))]
    pub async fn fetch_product_variation(
        &self,
        product_id: &str,
        variation_id: &str,
    ) -> Result<serde_json::Value> {
        self.fetch_json(
            &format!("{}/products/{product_id}/variations/{variation_id}", self.api_url),
            "variation fetch",
        )
        .await
    }

    async fn fetch_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Downstream(format!(
                "{what} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OrderStore for WooCommerceStore {
    #[instrument(skip(self, update), fields(status = ?update.status))]
    async fn update_status(&self, order_id: &str, update: &OrderStatusUpdate) -> Result<()> {
        let body = json!({
            "status": update.status.woocommerce_status(),
            "transaction_id": update.transaction_id.clone().unwrap_or_default(),
            "meta_data": [
                { "key": "_borica_approval", "value": update.approval.clone().unwrap_or_default() },
                { "key": "_borica_rrn", "value": update.transaction_id.clone().unwrap_or_default() },
                { "key": "_borica_int_ref", "value": update.internal_ref.clone().unwrap_or_default() },
                { "key": "_borica_amount", "value": update.amount.map(|a| a.to_string()).unwrap_or_default() },
                { "key": "_payment_method", "value": "borica_emv" },
                { "key": "_payment_method_title", "value": "Borica EMV" },
            ],
        });

        let response = self
            .client
            .put(format!("{}/orders/{order_id}", self.api_url))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Downstream(format!("order update returned {status}")));
        }
        debug!(order_id, "order updated");
        Ok(())
    }
}

impl fmt::Debug for WooCommerceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WooCommerceStore")
            .field("api_url", &self.api_url)
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> WooCommerceStore {
        WooCommerceStore::new(&StoreConfig {
            api_url: "https://shop.example.com/wp-json/wc/v3/".to_owned(),
            consumer_key: "ck_test".to_owned(),
            consumer_secret: "cs_secret".to_owned(),
        })
        .unwrap()
    }

    #[test]
    fn test_api_url_is_normalized() {
        let store = test_store();
        assert_eq!(store.api_url, "https://shop.example.com/wp-json/wc/v3");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", test_store());
        assert!(debug.contains("ck_test"));
        assert!(!debug.contains("cs_secret"));
    }
}
