//! Order status persistence.
//!
//! The callback processor talks to the storefront through the [`OrderStore`]
//! trait. Production deployments use the WooCommerce REST backend; tests use
//! the in-memory store.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{GatewayError, Result};

pub mod woocommerce;

pub use woocommerce::WooCommerceStore;

/// Final status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment approved by the gateway.
    Completed,
    /// Payment declined or errored.
    Failed,
}

impl OrderStatus {
    /// The WooCommerce order status this maps to.
    #[must_use]
    pub fn woocommerce_status(self) -> &'static str {
        match self {
            Self::Completed => "processing",
            Self::Failed => "failed",
        }
    }
}

/// Everything recorded against an order after a processed callback.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusUpdate {
    /// Outcome of the payment attempt.
    pub status: OrderStatus,
    /// Gateway retrieval reference number (`RRN`).
    pub transaction_id: Option<String>,
    /// Authorization code (`APPROVAL`).
    pub approval: Option<String>,
    /// Gateway internal reference (`INT_REF`).
    pub internal_ref: Option<String>,
    /// Amount in major units, as confirmed by the gateway.
    pub amount: Option<Decimal>,
    /// Confirmed currency code.
    pub currency: Option<String>,
    /// Numeric response code.
    pub response_code: Option<i32>,
    /// Customer-facing status message.
    pub status_message: Option<String>,
    /// Gateway timestamp as transmitted.
    pub gateway_timestamp: Option<String>,
}

/// Records payment outcomes against storefront orders.
///
/// Implementations must make [`OrderStore::update_status`] an idempotent
/// upsert: the gateway redelivers notifications, so applying the same update
/// twice must leave the order in the same state as applying it once.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Records the outcome of a payment attempt for `order_id`.
    async fn update_status(&self, order_id: &str, update: &OrderStatusUpdate) -> Result<()>;
}

#[async_trait]
impl<S: OrderStore> OrderStore for Arc<S> {
    async fn update_status(&self, order_id: &str, update: &OrderStatusUpdate) -> Result<()> {
        (**self).update_status(order_id, update).await
    }
}

#[async_trait]
impl<S: OrderStore> OrderStore for &S {
    async fn update_status(&self, order_id: &str, update: &OrderStatusUpdate) -> Result<()> {
        (**self).update_status(order_id, update).await
    }
}

/// In-memory order store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: Mutex<HashMap<String, OrderStatusUpdate>>,
    updates: AtomicUsize,
    fail: bool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every update fail with a downstream error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Last recorded update for an order.
    #[must_use]
    pub fn status_of(&self, order_id: &str) -> Option<OrderStatusUpdate> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    /// All recorded orders.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, OrderStatusUpdate> {
        self.orders.lock().unwrap().clone()
    }

    /// Number of update calls attempted, including failed ones.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn update_status(&self, order_id: &str, update: &OrderStatusUpdate) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GatewayError::Downstream("simulated store failure".to_owned()));
        }
        self.orders.lock().unwrap().insert(order_id.to_owned(), update.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(status: OrderStatus) -> OrderStatusUpdate {
        OrderStatusUpdate {
            status,
            transaction_id: Some("418510105467".to_owned()),
            approval: None,
            internal_ref: None,
            amount: Some(Decimal::new(4999, 2)),
            currency: Some("EUR".to_owned()),
            response_code: Some(0),
            status_message: None,
            gateway_timestamp: None,
        }
    }

    #[test]
    fn test_woocommerce_status_mapping() {
        assert_eq!(OrderStatus::Completed.woocommerce_status(), "processing");
        assert_eq!(OrderStatus::Failed.woocommerce_status(), "failed");
    }

    #[tokio::test]
    async fn test_in_memory_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        store.update_status("000123", &update(OrderStatus::Completed)).await.unwrap();
        store.update_status("000123", &update(OrderStatus::Completed)).await.unwrap();

        assert_eq!(store.update_count(), 2);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.status_of("000123").unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_failing_store_still_counts_attempts() {
        let store = InMemoryStore::new().failing();
        assert!(store.update_status("000123", &update(OrderStatus::Failed)).await.is_err());
        assert_eq!(store.update_count(), 1);
        assert!(store.status_of("000123").is_none());
    }

    #[tokio::test]
    async fn test_arc_delegation() {
        let store = Arc::new(InMemoryStore::new());
        store.update_status("000007", &update(OrderStatus::Failed)).await.unwrap();
        assert_eq!(store.status_of("000007").unwrap().status, OrderStatus::Failed);
    }
}
