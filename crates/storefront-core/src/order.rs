//! # Orders
//!
//! The options sent along with `initialize`, the options sent on capture,
//! and the order snapshot the backend returns once it captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::GatewayKind;
use crate::money::{Currency, Money};
use crate::pricing::CheckoutOptions;
use crate::tip::TipSpec;

// =============================================================================
// Order Options
// =============================================================================

/// Checkout choices the backend needs to price and initialize the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderOptions {
    pub pickup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<TipSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_tip: Option<TipSpec>,
    /// Pay cash on delivery / at pickup.
    pub cash: bool,
}

impl OrderOptions {
    /// Derives the initialize options for a checkout on `gateway`.
    ///
    /// The delivery tip is left out for pickup orders.
    pub fn for_checkout(options: &CheckoutOptions, gateway: &GatewayKind) -> Self {
        OrderOptions {
            pickup: options.is_pickup,
            tip: options.tip,
            delivery_tip: options.delivery_tip.filter(|_| !options.is_pickup),
            cash: *gateway == GatewayKind::Cash,
        }
    }
}

// =============================================================================
// Capture Options
// =============================================================================

/// Extra data sent with `capture_order`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CaptureOptions {
    /// Notes for the store. Blank notes are dropped.
    pub fn with_notes(notes: impl AsRef<str>) -> Self {
        let notes = notes.as_ref().trim();
        CaptureOptions {
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Order snapshot returned by a successful capture.
///
/// Only the fields the client acts on are typed; everything else the
/// backend sends stays in `meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: Value,
}

impl Order {
    /// Identifier shown to the customer, falling back to the internal id.
    pub fn display_id(&self) -> &str {
        self.public_id.as_deref().unwrap_or(&self.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
