//! Borica Payment Gateway Integration Core
//!
//! Integration library for card payments through the Borica gateway
//! (3-D Secure, form-based redirect flow), order status persistence to a
//! WooCommerce storefront, and installment financing through a partner
//! reseller API.
//!
//! # Overview
//!
//! The payment flow has three stages:
//!
//! - **Initiation**: an ordered set of request fields is signed with the
//!   merchant's RSA key ([`borica::PaymentInitiator`]) and the browser is
//!   redirected to the gateway via a self-submitting form.
//! - **Callback**: the gateway reports the outcome on a signed
//!   server-to-server notification, verified and applied to the order store
//!   by [`borica::CallbackProcessor`]. The browser return through `BACKREF`
//!   is advisory only.
//! - **Persistence**: outcomes are recorded through the [`store::OrderStore`]
//!   trait; production uses [`store::WooCommerceStore`].
//!
//! The [`financing`] module covers the installment path: applications are
//! AES-encrypted with a shared secret and submitted to the partner API.
//!
//! # Examples
//!
//! ```no_run
//! use borica_gateway::{
//!     borica::{OrderInput, PaymentInitiator},
//!     config::AppConfig,
//! };
//! use rust_decimal::Decimal;
//!
//! # fn example() -> borica_gateway::error::Result<()> {
//! let config = AppConfig::load("gateway.toml")?;
//! let initiator = PaymentInitiator::new(&config.gateway)?;
//!
//! let payment = initiator.initiate(&OrderInput {
//!     order_id: "123".into(),
//!     amount: Decimal::new(4999, 2),
//!     currency: "EUR".into(),
//!     description: "Поръчка #123".into(),
//!     customer_email: Some("buyer@example.com".into()),
//!     cardholder_name: None,
//!     merchant_token: None,
//! })?;
//!
//! // `payment.form_html` is served to the browser, which POSTs to the
//! // gateway; the outcome arrives later on the callback endpoint.
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod borica;
pub mod config;
pub mod error;
pub mod financing;
pub mod store;

pub use error::{GatewayError, Result};
