//! # Pricing
//!
//! Computes what the customer pays at checkout.
//!
//! ## Total Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        calculate_total                                  │
//! │                                                                         │
//! │   cart empty? ───yes──► 0                                               │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │   subtotal = Σ line.unit_subtotal × line.quantity                       │
//! │   tip      = TipSpec::resolve(subtotal)                                 │
//! │       │                                                                 │
//! │   pickup? ──yes──► subtotal + tip                                       │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │   subtotal + tip + delivery_tip.resolve(subtotal) + quote.amount        │
//! │                                         (missing quote counts as 0)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are always recomputed from their inputs. Nothing in this crate
//! stores a pre-computed total.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::money::{Currency, Money};
use crate::tip::TipSpec;
use crate::types::StoreOptions;

// =============================================================================
// Checkout Options
// =============================================================================

/// Tip and fulfilment choices made on the cart screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutOptions {
    #[serde(default)]
    pub tip: Option<TipSpec>,
    #[serde(default)]
    pub delivery_tip: Option<TipSpec>,
    #[serde(default)]
    pub is_pickup: bool,
}

impl CheckoutOptions {
    /// Drops choices the store has switched off.
    ///
    /// ## Rules
    /// - tips disabled → no tip
    /// - delivery tips disabled → no delivery tip
    /// - pickup disabled → delivery
    pub fn constrained_by(&self, store: &StoreOptions) -> CheckoutOptions {
        CheckoutOptions {
            tip: self.tip.filter(|_| store.tips_enabled),
            delivery_tip: self.delivery_tip.filter(|_| store.delivery_tips_enabled),
            is_pickup: self.is_pickup && store.pickup_enabled,
        }
    }

    /// True when a courier quote is part of the total.
    #[inline]
    pub fn is_delivery(&self) -> bool {
        !self.is_pickup
    }
}

// =============================================================================
// Delivery Quote
// =============================================================================

/// The courier fee for delivering this cart to the chosen place.
///
/// Immutable once returned; a re-fetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryQuote {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Money,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub distance_meters: Option<u64>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

impl DeliveryQuote {
    /// A quote carrying only an amount.
    pub fn with_amount(amount: Money) -> Self {
        DeliveryQuote {
            id: None,
            amount,
            currency: Currency::default(),
            distance_meters: None,
            duration_seconds: None,
        }
    }
}

/// Where the service quote for the current checkout stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Pickup orders need no courier.
    NotRequired,
    /// A fetch is in flight.
    Pending,
    Ready(DeliveryQuote),
    /// The last fetch failed; checkout stays blocked until a refresh succeeds.
    Failed(String),
}

impl QuoteStatus {
    pub fn quote(&self) -> Option<&DeliveryQuote> {
        match self {
            QuoteStatus::Ready(quote) => Some(quote),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QuoteStatus::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QuoteStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl Default for QuoteStatus {
    fn default() -> Self {
        QuoteStatus::NotRequired
    }
}

// =============================================================================
// Total Calculation
// =============================================================================

/// Computes the order total.
///
/// ## Rules
/// - empty cart → `0`, whatever the tips and quote say
/// - pickup → `subtotal + tip`
/// - delivery → `subtotal + tip + delivery_tip + quote` (no quote → `0`)
///
/// ## Example
/// ```rust
/// use storefront_core::cart::{Cart, CartLine};
/// use storefront_core::money::Money;
/// use storefront_core::pricing::{calculate_total, CheckoutOptions, DeliveryQuote};
/// use storefront_core::tip::TipSpec;
///
/// let mut cart = Cart::new("USD");
/// cart.push_line(CartLine::simple("p", "Pizza", Money::from_minor(2000), 1)).unwrap();
///
/// let pickup = CheckoutOptions {
///     tip: Some(TipSpec::Percent(10)),
///     delivery_tip: Some(TipSpec::Fixed(Money::from_minor(300))),
///     is_pickup: true,
/// };
/// let quote = DeliveryQuote::with_amount(Money::from_minor(500));
/// assert_eq!(calculate_total(&cart, &pickup, Some(&quote)).minor(), 2200);
/// ```
pub fn calculate_total(
    cart: &Cart,
    options: &CheckoutOptions,
    quote: Option<&DeliveryQuote>,
) -> Money {
    if cart.is_empty() {
        return Money::zero();
    }

    let subtotal = cart.subtotal();
    let mut total = subtotal + resolve_tip(options.tip, subtotal);

    if options.is_delivery() {
        total += resolve_tip(options.delivery_tip, subtotal);
        total += quote.map(|q| q.amount).unwrap_or_default();
    }

    total
}

fn resolve_tip(tip: Option<TipSpec>, subtotal: Money) -> Money {
    tip.map(|t| t.resolve(subtotal)).unwrap_or_default()
}

// =============================================================================
// Line-Item Breakdown
// =============================================================================

/// Which row of the checkout summary a line item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Subtotal,
    Tip,
    DeliveryTip,
    ServiceFee,
    Total,
}

impl LineItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            LineItemKind::Subtotal => "Cart Subtotal",
            LineItemKind::Tip => "Tip",
            LineItemKind::DeliveryTip => "Delivery Tip",
            LineItemKind::ServiceFee => "Service Fee",
            LineItemKind::Total => "Total",
        }
    }
}

/// One row of the checkout summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub label: String,
    pub amount: Money,
    /// Service fee still being quoted; show a spinner instead of the amount.
    pub pending: bool,
    /// Extra text such as `"10%"` or the quote error.
    pub detail: Option<String>,
}

impl LineItem {
    fn new(kind: LineItemKind, amount: Money) -> Self {
        LineItem {
            kind,
            label: kind.label().to_string(),
            amount,
            pending: false,
            detail: None,
        }
    }
}

/// The ordered checkout summary.
///
/// ```text
/// Cart Subtotal    20.00
/// Tip (10%)         2.00      only when tipping
/// Delivery Tip      3.00      only when tipping the driver on delivery
/// Service Fee       5.00      delivery only, pending while quoting
/// Total            30.00      == calculate_total
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutTotals {
    pub currency: Currency,
    pub lines: Vec<LineItem>,
}

impl CheckoutTotals {
    /// Builds the breakdown for the current checkout inputs.
    pub fn compute(cart: &Cart, options: &CheckoutOptions, quote: &QuoteStatus) -> Self {
        let subtotal = cart.subtotal();
        let mut lines = vec![LineItem::new(LineItemKind::Subtotal, subtotal)];

        if !cart.is_empty() {
            if let Some(tip) = options.tip {
                lines.push(tip_line(LineItemKind::Tip, tip, subtotal));
            }

            if options.is_delivery() {
                if let Some(tip) = options.delivery_tip {
                    lines.push(tip_line(LineItemKind::DeliveryTip, tip, subtotal));
                }

                let mut fee = LineItem::new(
                    LineItemKind::ServiceFee,
                    quote.quote().map(|q| q.amount).unwrap_or_default(),
                );
                fee.pending = quote.is_pending();
                fee.detail = quote.error().map(str::to_string);
                lines.push(fee);
            }
        }

        lines.push(LineItem::new(
            LineItemKind::Total,
            calculate_total(cart, options, quote.quote()),
        ));

        CheckoutTotals {
            currency: cart.currency.clone(),
            lines,
        }
    }

    pub fn get(&self, kind: LineItemKind) -> Option<&LineItem> {
        self.lines.iter().find(|line| line.kind == kind)
    }

    pub fn total(&self) -> Money {
        self.get(LineItemKind::Total)
            .map(|line| line.amount)
            .unwrap_or_default()
    }
}

fn tip_line(kind: LineItemKind, tip: TipSpec, subtotal: Money) -> LineItem {
    let mut line = LineItem::new(kind, tip.resolve(subtotal));
    if let TipSpec::Percent(_) = tip {
        line.detail = Some(tip.to_string());
    }
    line
}

// =============================================================================
// Unit Tests
// =============================================================================
