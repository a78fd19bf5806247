//! # Storefront Backend
//!
//! The seam between checkout orchestration and the storefront API.
//!
//! ## Calls Made During One Checkout
//! ```text
//! ┌────────────────────┐      ┌────────────────────────────────────────────┐
//! │ CheckoutOrchestrator│     │ StorefrontBackend                          │
//! ├────────────────────┤      ├────────────────────────────────────────────┤
//! │ load_gateways      │ ───► │ get_payment_gateways()                     │
//! │ refresh_quote      │ ───► │ fetch_service_quote(origin, dest, cart)    │
//! │ select_gateway     │ ───► │ initialize(customer, cart, quote, gw, opt) │
//! │ check_qpay_payment │ ───► │ check_qpay_payment(checkout_id)            │
//! │ place_order        │ ───► │ capture_order(token, notes)                │
//! │ (after capture)    │ ───► │ empty_cart(cart_id)                        │
//! └────────────────────┘      └────────────────────────────────────────────┘
//! ```
//!
//! Every call is bounded by [`call_with_timeout`]; implementations do not
//! need their own deadline.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use storefront_core::gateway::QpayNotification;
use storefront_core::{
    CaptureOptions, Cart, CartLine, CheckoutToken, Customer, DeliveryQuote, InitializePayload,
    Order, OrderOptions, PaymentGateway, Place, StoreLocation,
};
use tracing::warn;

use crate::error::{CheckoutError, CheckoutResult};

/// Storefront API used by the checkout.
///
/// Errors should be reported as [`CheckoutError::Network`] unless the backend
/// answered with something more specific.
#[async_trait]
pub trait StorefrontBackend: Send + Sync {
    /// Gateways configured on the store.
    async fn get_payment_gateways(&self) -> CheckoutResult<Vec<PaymentGateway>>;

    /// Starts a checkout on `gateway` and returns its payload.
    async fn initialize(
        &self,
        customer: &Customer,
        cart: &Cart,
        quote: Option<&DeliveryQuote>,
        gateway: &PaymentGateway,
        options: &OrderOptions,
    ) -> CheckoutResult<InitializePayload>;

    /// Turns an initialized checkout into an order.
    async fn capture_order(
        &self,
        token: &CheckoutToken,
        options: &CaptureOptions,
    ) -> CheckoutResult<Order>;

    async fn fetch_service_quote(
        &self,
        origin: &StoreLocation,
        destination: &Place,
        cart: &Cart,
    ) -> CheckoutResult<DeliveryQuote>;

    async fn add_to_cart(&self, cart_id: &str, line: &CartLine) -> CheckoutResult<Cart>;

    async fn update_cart_line(
        &self,
        cart_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> CheckoutResult<Cart>;

    async fn remove_cart_line(&self, cart_id: &str, line_id: &str) -> CheckoutResult<Cart>;

    async fn empty_cart(&self, cart_id: &str) -> CheckoutResult<Cart>;

    /// Asks QPay for the payment state of a checkout.
    async fn check_qpay_payment(&self, checkout_id: &str) -> CheckoutResult<QpayNotification>;
}

/// Runs a backend call with a deadline.
///
/// ## Errors
/// `CheckoutError::Timeout` naming `operation` when `limit` elapses first.
pub async fn call_with_timeout<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> CheckoutResult<T>
where
    F: Future<Output = CheckoutResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, secs = limit.as_secs(), "Storefront request timed out");
            Err(CheckoutError::timeout(operation, limit))
        }
    }
}
