//! # Payment Gateways
//!
//! Gateways the store accepts payment through, and what the backend hands
//! back when one is initialized for a checkout.
//!
//! ## Initialize Payloads
//! ```text
//! ┌───────────┬────────────────────────────────────────────────────────────┐
//! │ gateway   │ initialize(...) returns                                    │
//! ├───────────┼────────────────────────────────────────────────────────────┤
//! │ Stripe    │ payment intent, ephemeral key, customer id, token          │
//! │ QPay      │ invoice (QR + bank deep links), checkout id, token         │
//! │ Cash      │ token                                                      │
//! └───────────┴────────────────────────────────────────────────────────────┘
//! ```
//! The token is single use. It is tied to one cart, quote and gateway, and
//! is invalid after a capture or any cart change.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Gateway Kind
// =============================================================================

/// Which payment flow a gateway drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayKind {
    Cash,
    Stripe,
    Qpay,
    /// A gateway this client has no dedicated flow for.
    Other(String),
}

impl GatewayKind {
    /// Maps a backend gateway code or type to a kind.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::gateway::GatewayKind;
    ///
    /// assert_eq!(GatewayKind::from_code("Stripe"), GatewayKind::Stripe);
    /// assert_eq!(GatewayKind::from_code("cod"), GatewayKind::Cash);
    /// assert_eq!(GatewayKind::from_code("paypal"), GatewayKind::Other("paypal".into()));
    /// ```
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "cash" | "cod" => GatewayKind::Cash,
            "stripe" => GatewayKind::Stripe,
            "qpay" => GatewayKind::Qpay,
            other => GatewayKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayKind::Cash => "cash",
            GatewayKind::Stripe => "stripe",
            GatewayKind::Qpay => "qpay",
            GatewayKind::Other(code) => code,
        }
    }

    /// Card payments go through the payment sheet before capture.
    pub fn requires_payment_sheet(&self) -> bool {
        matches!(self, GatewayKind::Stripe)
    }
}

impl From<String> for GatewayKind {
    fn from(code: String) -> Self {
        GatewayKind::from_code(&code)
    }
}

impl From<GatewayKind> for String {
    fn from(kind: GatewayKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Checkout Token
// =============================================================================

/// Opaque single-use token authorizing one capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct CheckoutToken(String);

impl CheckoutToken {
    pub fn new(token: impl Into<String>) -> Self {
        CheckoutToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Payment Gateway
// =============================================================================

/// A payment gateway configured on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGateway {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: GatewayKind,
    #[serde(default)]
    pub sandbox: bool,
    /// Set once `initialize` succeeded for the current checkout.
    #[serde(default)]
    pub checkout_token: Option<CheckoutToken>,
}

impl PaymentGateway {
    pub fn is_initialized(&self) -> bool {
        self.checkout_token.is_some()
    }

    pub fn is_cash(&self) -> bool {
        self.kind == GatewayKind::Cash
    }

    pub fn is_stripe(&self) -> bool {
        self.kind == GatewayKind::Stripe
    }

    pub fn is_qpay(&self) -> bool {
        self.kind == GatewayKind::Qpay
    }
}

/// Finds a gateway by code, case-insensitively.
pub fn find_gateway<'a>(gateways: &'a [PaymentGateway], code: &str) -> Option<&'a PaymentGateway> {
    let code = code.trim();
    gateways.iter().find(|g| g.code.eq_ignore_ascii_case(code))
}

// =============================================================================
// QPay
// =============================================================================

/// A bank app the customer can open to pay a QPay invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QpayBankLink {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: String,
    /// Deep link into the bank app.
    pub link: String,
}

/// QPay invoice shown as a QR code plus bank deep links.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QpayInvoice {
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub qr_text: Option<String>,
    #[serde(default)]
    pub qr_image: Option<String>,
    #[serde(default)]
    pub urls: Vec<QpayBankLink>,
}

/// Status value QPay reports for a settled invoice.
pub const QPAY_STATUS_PAID: &str = "PAID";

/// Error code QPay reports before any payment exists.
pub const QPAY_ERROR_NOT_FOUND: &str = "PAYMENT_NOTFOUND";

/// A payment notification for a QPay checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpayPayment {
    pub payment_status: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl QpayPayment {
    pub fn is_paid(&self) -> bool {
        self.payment_status == QPAY_STATUS_PAID
    }
}

/// An error reported on the QPay checkout channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpayError {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl QpayError {
    /// No payment attempt yet. Not worth telling the customer about.
    pub fn is_not_found(&self) -> bool {
        self.error == QPAY_ERROR_NOT_FOUND
    }
}

/// One message from QPay: a payment, an error, or both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QpayNotification {
    #[serde(default)]
    pub payment: Option<QpayPayment>,
    #[serde(default)]
    pub error: Option<QpayError>,
}

// =============================================================================
// Initialize Payload
// =============================================================================

/// What `initialize` returned, per gateway kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gateway", rename_all = "snake_case")]
pub enum InitializePayload {
    Card {
        payment_intent: String,
        ephemeral_key: String,
        customer_id: String,
        token: CheckoutToken,
    },
    Qpay {
        invoice: QpayInvoice,
        checkout_id: String,
        token: CheckoutToken,
    },
    Cash {
        token: CheckoutToken,
    },
}

impl InitializePayload {
    pub fn token(&self) -> &CheckoutToken {
        match self {
            InitializePayload::Card { token, .. }
            | InitializePayload::Qpay { token, .. }
            | InitializePayload::Cash { token } => token,
        }
    }

    /// True when the payload shape is the one `kind` produces.
    pub fn matches(&self, kind: &GatewayKind) -> bool {
        matches!(
            (self, kind),
            (InitializePayload::Card { .. }, GatewayKind::Stripe)
                | (InitializePayload::Qpay { .. }, GatewayKind::Qpay)
                | (InitializePayload::Cash { .. }, GatewayKind::Cash)
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
