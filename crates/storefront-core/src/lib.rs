//! # storefront-core: Pure Checkout Logic for the Storefront
//!
//! This crate holds the pricing rules and the checkout state machine as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Checkout Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile Frontend                              │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Order Tracking             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-checkout (orchestration)                │   │
//! │  │    select_gateway, place_order, refresh quote, cart service     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  cart   │ │ pricing │ │ gateway │ │checkout │  │   │
//! │  │   │  Money  │ │  Cart   │ │ totals  │ │ kinds   │ │  state  │  │   │
//! │  │   │ TipSpec │ │CartLine │ │ lines   │ │ payload │ │ machine │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO STORAGE • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and currency with integer arithmetic
//! - [`tip`] - Fixed or percentage tips and their parsing rules
//! - [`product`] - Products, variations and add-ons
//! - [`cart`] - Cart and cart lines
//! - [`pricing`] - Total calculation and the line-item breakdown
//! - [`gateway`] - Payment gateways and checkout tokens
//! - [`checkout`] - Checkout state machine
//! - [`order`] - Captured order snapshot and order options
//! - [`types`] - Customer, places, store locations and store options
//! - [`validation`] - Input validation and the place-order guard
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::pricing::{calculate_total, CheckoutOptions, DeliveryQuote};
//! use storefront_core::tip::TipSpec;
//! use storefront_core::cart::{Cart, CartLine};
//!
//! let mut cart = Cart::new("USD");
//! cart.push_line(CartLine::simple("prod_1", "Burger", Money::from_minor(2000), 1)).unwrap();
//!
//! let options = CheckoutOptions {
//!     tip: Some(TipSpec::Percent(10)),
//!     delivery_tip: Some(TipSpec::Fixed(Money::from_minor(300))),
//!     is_pickup: false,
//! };
//! let quote = DeliveryQuote::with_amount(Money::from_minor(500));
//!
//! assert_eq!(calculate_total(&cart, &options, Some(&quote)).minor(), 3000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;
pub mod tip;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine};
pub use checkout::{CheckoutEvent, CheckoutState};
pub use error::{CoreError, CoreResult, ValidationError};
pub use gateway::{find_gateway, CheckoutToken, GatewayKind, InitializePayload, PaymentGateway};
pub use money::{Currency, Money};
pub use order::{CaptureOptions, Order, OrderOptions};
pub use pricing::{calculate_total, CheckoutOptions, CheckoutTotals, DeliveryQuote, QuoteStatus};
pub use product::{Product, ProductSelection};
pub use tip::TipSpec;
pub use types::*;
pub use validation::{PlaceOrderBlocker, PlaceOrderCheck};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Guards against accidental over-ordering (typing 100 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 99;

/// Upper bound accepted for a percentage tip.
pub const MAX_TIP_PERCENT: u32 = 100;
