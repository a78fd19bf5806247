//! In-memory backend and payment sheet for orchestration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use storefront_core::gateway::{QpayBankLink, QpayInvoice, QpayNotification};
use storefront_core::{
    CaptureOptions, Cart, CartLine, CheckoutToken, Customer, DeliveryQuote, GatewayKind,
    InitializePayload, Money, Order, OrderOptions, PaymentGateway, Place, StoreLocation,
};

use crate::backend::StorefrontBackend;
use crate::error::{CheckoutError, CheckoutResult};
use crate::payment::{PaymentMethodSelection, PaymentSheet, PaymentSheetSetup};

// =============================================================================
// Fixtures
// =============================================================================

pub mod fixtures {
    use storefront_core::product::{Addon, AddonCategory, ProductVariation, VariantOption};
    use storefront_core::{Coordinates, Product};

    use super::*;

    pub const CART_ID: &str = "cart_test";

    pub fn empty_cart() -> Cart {
        Cart {
            id: CART_ID.to_string(),
            ..Cart::new("USD")
        }
    }

    /// One line whose subtotal is `subtotal`.
    pub fn cart(subtotal: i64) -> Cart {
        let mut cart = empty_cart();
        cart.lines.push(CartLine::simple(
            "prod_combo",
            "Combo",
            Money::from_minor(subtotal),
            1,
        ));
        cart
    }

    pub fn customer() -> Customer {
        Customer {
            id: "customer_1".to_string(),
            name: "Tuya".to_string(),
            email: Some("tuya@example.com".to_string()),
            phone: None,
            token: Some("session_1".to_string()),
        }
    }

    pub fn place() -> Place {
        Place {
            id: Some("place_1".to_string()),
            name: Some("Home".to_string()),
            street1: "Peace Avenue 17".to_string(),
            location: Some(Coordinates::new(47.9185, 106.9176)),
            ..Place::default()
        }
    }

    pub fn store_location() -> StoreLocation {
        StoreLocation {
            id: "loc_central".to_string(),
            name: "Central".to_string(),
            location: Coordinates::new(47.9212, 106.9186),
        }
    }

    pub fn gateway(code: &str) -> PaymentGateway {
        PaymentGateway {
            id: format!("gateway_{code}"),
            name: code.to_uppercase(),
            code: code.to_string(),
            kind: GatewayKind::from_code(code),
            sandbox: true,
            checkout_token: None,
        }
    }

    pub fn burger() -> Product {
        Product {
            id: "prod_burger".to_string(),
            name: "Burger".to_string(),
            price: Money::from_minor(1200),
            sale_price: None,
            is_on_sale: false,
            variations: vec![ProductVariation {
                id: "var_size".to_string(),
                name: "Size".to_string(),
                is_required: true,
                options: vec![
                    VariantOption {
                        id: "opt_small".to_string(),
                        name: "Small".to_string(),
                        additional_cost: Money::zero(),
                    },
                    VariantOption {
                        id: "opt_large".to_string(),
                        name: "Large".to_string(),
                        additional_cost: Money::from_minor(300),
                    },
                ],
            }],
            addon_categories: vec![AddonCategory {
                id: "cat_extras".to_string(),
                name: "Extras".to_string(),
                addons: vec![Addon {
                    id: "addon_cheese".to_string(),
                    name: "Cheese".to_string(),
                    price: Money::from_minor(100),
                }],
            }],
        }
    }
}

// =============================================================================
// Fake Backend
// =============================================================================

#[derive(Debug)]
struct BackendState {
    gateways: Vec<PaymentGateway>,
    cart: Cart,
    quote_amount: i64,
    delay: Duration,
    failures: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    payload_override: Option<InitializePayload>,
    qpay: QpayNotification,
    last_order_options: Option<OrderOptions>,
    last_initialized_cart: Option<Cart>,
    last_capture: Option<(CheckoutToken, CaptureOptions)>,
    orders: u32,
}

/// Storefront backend that keeps everything in memory.
#[derive(Debug)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend {
            state: Mutex::new(BackendState {
                gateways: vec![
                    fixtures::gateway("cash"),
                    fixtures::gateway("stripe"),
                    fixtures::gateway("qpay"),
                ],
                cart: fixtures::empty_cart(),
                quote_amount: 0,
                delay: Duration::ZERO,
                failures: HashSet::new(),
                calls: HashMap::new(),
                payload_override: None,
                qpay: QpayNotification::default(),
                last_order_options: None,
                last_initialized_cart: None,
                last_capture: None,
                orders: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn set_gateways(&self, gateways: Vec<PaymentGateway>) {
        self.lock().gateways = gateways;
    }

    pub fn set_cart(&self, cart: Cart) {
        self.lock().cart = cart;
    }

    pub fn server_cart(&self) -> Cart {
        self.lock().cart.clone()
    }

    pub fn set_quote_amount(&self, amount: i64) {
        self.lock().quote_amount = amount;
    }

    /// Every call waits this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    /// The next call to `operation` fails with a network error.
    pub fn fail_next(&self, operation: &'static str) {
        self.lock().failures.insert(operation);
    }

    pub fn override_payload(&self, payload: InitializePayload) {
        self.lock().payload_override = Some(payload);
    }

    pub fn set_qpay_notification(&self, notification: QpayNotification) {
        self.lock().qpay = notification;
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn last_order_options(&self) -> Option<OrderOptions> {
        self.lock().last_order_options
    }

    /// The cart sent with the most recent `initialize`.
    pub fn last_initialized_cart(&self) -> Option<Cart> {
        self.lock().last_initialized_cart.clone()
    }

    pub fn last_capture(&self) -> Option<(CheckoutToken, CaptureOptions)> {
        self.lock().last_capture.clone()
    }

    /// Records the call, waits the configured delay, then applies any
    /// scheduled failure.
    async fn enter(&self, operation: &'static str) -> CheckoutResult<()> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(operation).or_insert(0) += 1;
            state.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.lock().failures.remove(operation) {
            return Err(CheckoutError::Network(format!("{operation}: connection reset")));
        }
        Ok(())
    }
}

fn qpay_invoice() -> QpayInvoice {
    QpayInvoice {
        invoice_id: Some("inv_1".to_string()),
        qr_text: Some("0002010102121531".to_string()),
        qr_image: None,
        urls: vec![
            QpayBankLink {
                name: "Khan bank".to_string(),
                description: "Khan bank".to_string(),
                logo: String::new(),
                link: "khanbank://q?qPay_QRcode=0002010102121531".to_string(),
            },
            QpayBankLink {
                name: "Broken".to_string(),
                description: String::new(),
                logo: String::new(),
                link: "not a link".to_string(),
            },
        ],
    }
}

#[async_trait]
impl StorefrontBackend for FakeBackend {
    async fn get_payment_gateways(&self) -> CheckoutResult<Vec<PaymentGateway>> {
        self.enter("get_payment_gateways").await?;
        Ok(self.lock().gateways.clone())
    }

    async fn initialize(
        &self,
        customer: &Customer,
        cart: &Cart,
        _quote: Option<&DeliveryQuote>,
        gateway: &PaymentGateway,
        options: &OrderOptions,
    ) -> CheckoutResult<InitializePayload> {
        self.enter("initialize").await?;
        let mut state = self.lock();
        state.last_order_options = Some(*options);
        state.last_initialized_cart = Some(cart.clone());
        if let Some(payload) = state.payload_override.take() {
            return Ok(payload);
        }

        let token = CheckoutToken::new(format!("tok_{}", gateway.code));
        match gateway.kind {
            GatewayKind::Stripe => Ok(InitializePayload::Card {
                payment_intent: "pi_secret_1".to_string(),
                ephemeral_key: "ek_1".to_string(),
                customer_id: format!("cus_{}", customer.id),
                token,
            }),
            GatewayKind::Qpay => Ok(InitializePayload::Qpay {
                invoice: qpay_invoice(),
                checkout_id: "checkout_qpay_1".to_string(),
                token,
            }),
            GatewayKind::Cash => Ok(InitializePayload::Cash { token }),
            GatewayKind::Other(ref code) => {
                Err(CheckoutError::Network(format!("gateway {code} is not enabled")))
            }
        }
    }

    async fn capture_order(
        &self,
        token: &CheckoutToken,
        options: &CaptureOptions,
    ) -> CheckoutResult<Order> {
        self.enter("capture_order").await?;
        let mut state = self.lock();
        state.orders += 1;
        state.last_capture = Some((token.clone(), options.clone()));
        Ok(Order {
            id: format!("order_{}", state.orders),
            public_id: Some(format!("#10{:02}", state.orders)),
            status: Some("created".to_string()),
            total: Some(state.cart.subtotal()),
            currency: Some(state.cart.currency.clone()),
            created_at: None,
            meta: json!({ "notes": options.notes }),
        })
    }

    async fn fetch_service_quote(
        &self,
        origin: &StoreLocation,
        _destination: &Place,
        _cart: &Cart,
    ) -> CheckoutResult<DeliveryQuote> {
        self.enter("fetch_service_quote").await?;
        let amount = self.lock().quote_amount;
        Ok(DeliveryQuote {
            id: Some(format!("quote_{}", origin.id)),
            ..DeliveryQuote::with_amount(Money::from_minor(amount))
        })
    }

    async fn add_to_cart(&self, _cart_id: &str, line: &CartLine) -> CheckoutResult<Cart> {
        self.enter("add_to_cart").await?;
        let mut state = self.lock();
        state
            .cart
            .push_line(line.clone())
            .map_err(|e| CheckoutError::Network(e.to_string()))?;
        Ok(state.cart.clone())
    }

    async fn update_cart_line(
        &self,
        _cart_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> CheckoutResult<Cart> {
        self.enter("update_cart_line").await?;
        let mut state = self.lock();
        state
            .cart
            .update_quantity(line_id, quantity)
            .map_err(|e| CheckoutError::Network(e.to_string()))?;
        Ok(state.cart.clone())
    }

    async fn remove_cart_line(&self, _cart_id: &str, line_id: &str) -> CheckoutResult<Cart> {
        self.enter("remove_cart_line").await?;
        let mut state = self.lock();
        state
            .cart
            .remove_line(line_id)
            .map_err(|e| CheckoutError::Network(e.to_string()))?;
        Ok(state.cart.clone())
    }

    async fn empty_cart(&self, _cart_id: &str) -> CheckoutResult<Cart> {
        self.enter("empty_cart").await?;
        let mut state = self.lock();
        state.cart.empty();
        Ok(state.cart.clone())
    }

    async fn check_qpay_payment(&self, _checkout_id: &str) -> CheckoutResult<QpayNotification> {
        self.enter("check_qpay_payment").await?;
        Ok(self.lock().qpay.clone())
    }
}

// =============================================================================
// Fake Payment Sheet
// =============================================================================

/// Payment sheet that always picks the same card.
#[derive(Debug, Default)]
pub struct FakePaymentSheet {
    pub setups: Mutex<Vec<PaymentSheetSetup>>,
    pub presented: Mutex<usize>,
    pub confirmed: Mutex<usize>,
    pub cancel: Mutex<bool>,
    pub fail_confirm: Mutex<bool>,
}

impl FakePaymentSheet {
    pub const CARD_LABEL: &'static str = "Visa •••• 4242";

    pub fn confirmations(&self) -> usize {
        *self.confirmed.lock().unwrap()
    }
}

#[async_trait]
impl PaymentSheet for FakePaymentSheet {
    async fn init_payment_sheet(&self, setup: &PaymentSheetSetup) -> CheckoutResult<()> {
        self.setups.lock().unwrap().push(setup.clone());
        Ok(())
    }

    async fn present_payment_sheet(&self) -> CheckoutResult<Option<PaymentMethodSelection>> {
        *self.presented.lock().unwrap() += 1;
        if *self.cancel.lock().unwrap() {
            return Ok(None);
        }
        Ok(Some(PaymentMethodSelection {
            label: Self::CARD_LABEL.to_string(),
        }))
    }

    async fn confirm_payment(&self) -> CheckoutResult<()> {
        if *self.fail_confirm.lock().unwrap() {
            return Err(CheckoutError::PaymentSheet("card declined".into()));
        }
        *self.confirmed.lock().unwrap() += 1;
        Ok(())
    }
}
