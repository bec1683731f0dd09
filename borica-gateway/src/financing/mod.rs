//! Financing partner integration.
//!
//! Customers can pay through an installment financing partner instead of the
//! card gateway. The integration has two halves: a symmetric payload cryptor
//! ([`cryptor`]) and the reseller API client ([`register`]) that submits
//! encrypted applications and fetches installment quotes.

pub mod cryptor;
pub mod register;

pub use cryptor::{Encoding, PayloadCryptor};
pub use register::{
    monthly_payment, ApplicationData, DeliveryAddress, FinancedItem, FinancingClient,
};
