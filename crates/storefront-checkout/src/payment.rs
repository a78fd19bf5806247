//! # Payment Sheet
//!
//! The card SDK seam. The app hosts the actual sheet; the orchestrator only
//! tells it when to set up, show, and confirm.
//!
//! ```text
//! initialize (Card payload)
//!      │
//!      ▼
//! init_payment_sheet(setup)      ← sheet flow only
//!      │
//!      ▼
//! present_payment_sheet()        → label of the chosen card
//!      │
//!      ▼
//! confirm_payment()              ← on "place order", before capture
//! ```

use async_trait::async_trait;
use url::Url;

use crate::error::{CheckoutError, CheckoutResult};

/// Everything the SDK needs to build the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSheetSetup {
    pub payment_intent: String,
    pub ephemeral_key: String,
    pub customer_id: String,
    pub merchant_display_name: String,
    pub merchant_country_code: String,
    pub return_url: Option<Url>,
}

/// The card the customer picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethodSelection {
    /// e.g. "Visa •••• 4242"
    pub label: String,
}

/// Card payment SDK.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    async fn init_payment_sheet(&self, setup: &PaymentSheetSetup) -> CheckoutResult<()>;

    /// Shows the sheet. `None` when the customer closed it without choosing.
    async fn present_payment_sheet(&self) -> CheckoutResult<Option<PaymentMethodSelection>>;

    /// Confirms the payment with the chosen method.
    async fn confirm_payment(&self) -> CheckoutResult<()>;
}

/// Payment sheet for apps without card payments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaymentSheet;

#[async_trait]
impl PaymentSheet for NoPaymentSheet {
    async fn init_payment_sheet(&self, _setup: &PaymentSheetSetup) -> CheckoutResult<()> {
        Err(CheckoutError::PaymentSheet("card payments are not available".into()))
    }

    async fn present_payment_sheet(&self) -> CheckoutResult<Option<PaymentMethodSelection>> {
        Err(CheckoutError::PaymentSheet("card payments are not available".into()))
    }

    async fn confirm_payment(&self) -> CheckoutResult<()> {
        Err(CheckoutError::PaymentSheet("card payments are not available".into()))
    }
}
