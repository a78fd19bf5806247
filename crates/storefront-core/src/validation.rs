//! # Validation Module
//!
//! Input validation and the "can the customer place this order" guard.
//!
//! ## Place-Order Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Place Order button                                                     │
//! │                                                                         │
//! │  PlaceOrderCheck::blockers() ← THIS MODULE                              │
//! │       │                                                                 │
//! │       ├── request in flight?             → Busy                         │
//! │       ├── no signed-in customer?         → NotAuthenticated             │
//! │       ├── delivery without a place?      → MissingDeliveryPlace         │
//! │       ├── empty cart?                    → EmptyCart                    │
//! │       ├── no gateway / no token yet?     → NoGateway / NotInitialized   │
//! │       ├── card without payment method?   → MissingPaymentMethod         │
//! │       ├── delivery quote not ready?      → QuotePending / QuoteFailed   │
//! │       │                                                                 │
//! │       └── empty list → button enabled                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::validate_quantity;
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::Cart;
use crate::checkout::CheckoutState;
use crate::error::ValidationError;
use crate::gateway::PaymentGateway;
use crate::pricing::QuoteStatus;
use crate::types::{Customer, Place};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest order note the store accepts.
pub const MAX_NOTES_LENGTH: usize = 500;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be within `1..=MAX_LINE_QUANTITY`
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an ISO 4217 currency code.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_currency_code;
///
/// assert!(validate_currency_code("MNT").is_ok());
/// assert!(validate_currency_code("usd").is_ok());
/// assert!(validate_currency_code("US").is_err());
/// ```
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter ISO code".to_string(),
        });
    }

    Ok(())
}

/// Validates order notes and returns them trimmed.
pub fn validate_order_notes(notes: &str) -> ValidationResult<String> {
    let notes = notes.trim();

    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::OutOfRange {
            field: "notes".to_string(),
            min: 0,
            max: MAX_NOTES_LENGTH as i64,
        });
    }

    Ok(notes.to_string())
}

// =============================================================================
// Place-Order Guard
// =============================================================================

/// Why the order cannot be placed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PlaceOrderBlocker {
    Busy,
    NotAuthenticated,
    MissingDeliveryPlace,
    EmptyCart,
    NoGateway,
    GatewayNotInitialized,
    MissingPaymentMethod,
    QuotePending,
    QuoteFailed,
}

impl fmt::Display for PlaceOrderBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            PlaceOrderBlocker::Busy => "A request is still in progress",
            PlaceOrderBlocker::NotAuthenticated => "Sign in to place your order",
            PlaceOrderBlocker::MissingDeliveryPlace => "Choose a delivery address",
            PlaceOrderBlocker::EmptyCart => "Your cart is empty",
            PlaceOrderBlocker::NoGateway => "Choose a payment method",
            PlaceOrderBlocker::GatewayNotInitialized => "Payment is still being prepared",
            PlaceOrderBlocker::MissingPaymentMethod => "Add a card to pay with",
            PlaceOrderBlocker::QuotePending => "Delivery fee is still being calculated",
            PlaceOrderBlocker::QuoteFailed => "Delivery fee could not be calculated",
        };
        f.write_str(message)
    }
}

/// Everything the place-order button depends on.
#[derive(Debug, Clone, Copy)]
pub struct PlaceOrderCheck<'a> {
    pub state: &'a CheckoutState,
    pub customer: Option<&'a Customer>,
    pub cart: &'a Cart,
    pub is_pickup: bool,
    pub deliver_to: Option<&'a Place>,
    pub gateway: Option<&'a PaymentGateway>,
    /// Label of the card picked in the payment sheet, if any.
    pub payment_method_label: Option<&'a str>,
    pub quote: &'a QuoteStatus,
}

impl PlaceOrderCheck<'_> {
    /// Every reason the order cannot be placed, in display order.
    pub fn blockers(&self) -> Vec<PlaceOrderBlocker> {
        let mut blockers = Vec::new();

        if self.state.is_busy() {
            blockers.push(PlaceOrderBlocker::Busy);
        }

        if !self.customer.is_some_and(Customer::is_authenticated) {
            blockers.push(PlaceOrderBlocker::NotAuthenticated);
        }

        if !self.is_pickup && !self.deliver_to.is_some_and(Place::is_deliverable) {
            blockers.push(PlaceOrderBlocker::MissingDeliveryPlace);
        }

        if self.cart.is_empty() {
            blockers.push(PlaceOrderBlocker::EmptyCart);
        }

        match self.gateway {
            None => blockers.push(PlaceOrderBlocker::NoGateway),
            Some(gateway) => {
                if !gateway.is_initialized() || self.state.token().is_none() {
                    blockers.push(PlaceOrderBlocker::GatewayNotInitialized);
                }
                let has_label = self
                    .payment_method_label
                    .is_some_and(|label| !label.trim().is_empty());
                if gateway.is_stripe() && !has_label {
                    blockers.push(PlaceOrderBlocker::MissingPaymentMethod);
                }
            }
        }

        if !self.is_pickup {
            match self.quote {
                QuoteStatus::Ready(_) => {}
                QuoteStatus::Failed(_) => blockers.push(PlaceOrderBlocker::QuoteFailed),
                QuoteStatus::Pending | QuoteStatus::NotRequired => {
                    blockers.push(PlaceOrderBlocker::QuotePending)
                }
            }
        }

        blockers
    }

    pub fn can_place_order(&self) -> bool {
        self.blockers().is_empty()
    }
}

/// Shorthand for [`PlaceOrderCheck::can_place_order`].
pub fn can_place_order(check: &PlaceOrderCheck<'_>) -> bool {
    check.can_place_order()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::gateway::{CheckoutToken, GatewayKind};
    use crate::money::Money;
    use crate::pricing::DeliveryQuote;
    use crate::types::Coordinates;

    struct Fixture {
        state: CheckoutState,
        customer: Customer,
        cart: Cart,
        place: Place,
        gateway: PaymentGateway,
        quote: QuoteStatus,
    }

    fn fixture(kind: GatewayKind) -> Fixture {
        let mut cart = Cart::new("USD");
        cart.push_line(CartLine::simple("p", "Soup", Money::from_minor(900), 1))
            .unwrap();
        let token = CheckoutToken::new("tok");

        Fixture {
            state: CheckoutState::Initializing {
                gateway: kind.clone(),
                token: Some(token.clone()),
            },
            customer: Customer {
                id: "customer_1".to_string(),
                name: "Saraa".to_string(),
                email: None,
                phone: None,
                token: None,
            },
            cart,
            place: Place {
                id: Some("place_1".to_string()),
                street1: "Peace Ave 1".to_string(),
                location: Some(Coordinates::new(47.9, 106.9)),
                ..Default::default()
            },
            gateway: PaymentGateway {
                id: "gw".to_string(),
                name: kind.to_string(),
                code: kind.to_string(),
                kind,
                sandbox: false,
                checkout_token: Some(token),
            },
            quote: QuoteStatus::Ready(DeliveryQuote::with_amount(Money::from_minor(500))),
        }
    }

    fn check<'a>(f: &'a Fixture, label: Option<&'a str>) -> PlaceOrderCheck<'a> {
        PlaceOrderCheck {
            state: &f.state,
            customer: Some(&f.customer),
            cart: &f.cart,
            is_pickup: false,
            deliver_to: Some(&f.place),
            gateway: Some(&f.gateway),
            payment_method_label: label,
            quote: &f.quote,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("SGD").is_ok());
        assert!(validate_currency_code("").is_err());
        assert!(validate_currency_code("DOLLAR").is_err());
        assert!(validate_currency_code("U$D").is_err());
    }

    #[test]
    fn test_validate_order_notes() {
        assert_eq!(validate_order_notes("  leave at door ").unwrap(), "leave at door");
        assert!(validate_order_notes(&"x".repeat(MAX_NOTES_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_ready_cash_order_can_be_placed() {
        let f = fixture(GatewayKind::Cash);
        assert!(can_place_order(&check(&f, None)));
    }

    #[test]
    fn test_card_needs_payment_method_label() {
        let f = fixture(GatewayKind::Stripe);
        assert_eq!(
            check(&f, None).blockers(),
            vec![PlaceOrderBlocker::MissingPaymentMethod]
        );
        assert!(check(&f, Some("Visa •••• 4242")).can_place_order());
    }

    #[test]
    fn test_gateway_without_token_blocks() {
        let mut f = fixture(GatewayKind::Cash);
        f.gateway.checkout_token = None;
        f.state = CheckoutState::Initializing {
            gateway: GatewayKind::Cash,
            token: None,
        };
        let blockers = check(&f, None).blockers();
        assert!(blockers.contains(&PlaceOrderBlocker::Busy));
        assert!(blockers.contains(&PlaceOrderBlocker::GatewayNotInitialized));
    }

    #[test]
    fn test_delivery_requirements() {
        let mut f = fixture(GatewayKind::Cash);
        f.place.id = None;
        f.place.location = None;
        f.quote = QuoteStatus::Failed("no couriers".to_string());

        let blockers = check(&f, None).blockers();
        assert_eq!(
            blockers,
            vec![
                PlaceOrderBlocker::MissingDeliveryPlace,
                PlaceOrderBlocker::QuoteFailed
            ]
        );

        let mut pickup = check(&f, None);
        pickup.is_pickup = true;
        assert!(pickup.can_place_order());
    }

    #[test]
    fn test_missing_customer_and_empty_cart() {
        let mut f = fixture(GatewayKind::Cash);
        f.cart.empty();
        let mut c = check(&f, None);
        c.customer = None;
        c.gateway = None;
        assert_eq!(
            c.blockers(),
            vec![
                PlaceOrderBlocker::NotAuthenticated,
                PlaceOrderBlocker::EmptyCart,
                PlaceOrderBlocker::NoGateway
            ]
        );
    }
}
