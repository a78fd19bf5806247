//! # Checkout Error Types
//!
//! Error types for checkout orchestration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │ NetworkFailure  │  │ValidationFailure│  │    GatewayMismatch      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  NotReady       │  │  GatewayNotFound        │ │
//! │  │  Timeout        │  │  Core           │  │  GatewayMismatch        │ │
//! │  │  PaymentSheet   │  │  CheckoutChanged│  │  UnsupportedGateway     │ │
//! │  │  PaymentStatus… │  │  AwaitingPayment│  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Internal: Cache, Internal                                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is caught at the call site, logged, and handed back to the
//! caller. None of them is fatal; the customer can always try again.

use std::fmt;
use std::time::Duration;

use storefront_cache::CacheError;
use storefront_core::{CoreError, GatewayKind, PlaceOrderBlocker};
use thiserror::Error;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Coarse category used by the UI to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkFailure,
    ValidationFailure,
    GatewayMismatch,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NetworkFailure => write!(f, "network_failure"),
            ErrorKind::ValidationFailure => write!(f, "validation_failure"),
            ErrorKind::GatewayMismatch => write!(f, "gateway_mismatch"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Checkout error type.
#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Network Errors
    // =========================================================================
    /// The backend could not be reached or answered with an error.
    #[error("Storefront request failed: {0}")]
    Network(String),

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    /// The card SDK reported a failure.
    #[error("Payment sheet error: {0}")]
    PaymentSheet(String),

    /// The customer dismissed the payment sheet.
    #[error("Payment was cancelled")]
    PaymentCancelled,

    /// QPay answered with a status we do not capture on.
    #[error("Payment status unknown: {0}")]
    PaymentStatusUnknown(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// The place-order guard is not satisfied.
    #[error("Order cannot be placed: {}", join_blockers(.0))]
    NotReady(Vec<PlaceOrderBlocker>),

    /// QPay orders are captured when the payment arrives, not on demand.
    #[error("Waiting for the payment to arrive")]
    AwaitingPayment,

    /// Cart, customer or options changed while a request was in flight.
    #[error("Checkout changed while {0}; please try again")]
    CheckoutChanged(&'static str),

    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Payment gateway not found: {0}")]
    GatewayNotFound(String),

    /// The store offers a gateway this app cannot drive.
    #[error("Unsupported payment gateway: {0}")]
    UnsupportedGateway(String),

    /// The operation or payload belongs to a different gateway.
    #[error("Gateway mismatch: expected {expected}, got {actual}")]
    GatewayMismatch { expected: GatewayKind, actual: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_blockers(blockers: &[PlaceOrderBlocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for CheckoutError {
    fn from(err: url::ParseError) -> Self {
        CheckoutError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::ConfigSaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Internal(format!("serialization failed: {}", err))
    }
}

impl CheckoutError {
    pub(crate) fn timeout(operation: &'static str, limit: Duration) -> Self {
        CheckoutError::Timeout {
            operation,
            secs: limit.as_secs(),
        }
    }

    pub(crate) fn mismatch(expected: &GatewayKind, actual: impl Into<String>) -> Self {
        CheckoutError::GatewayMismatch {
            expected: expected.clone(),
            actual: actual.into(),
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Network(_)
            | CheckoutError::Timeout { .. }
            | CheckoutError::PaymentSheet(_)
            | CheckoutError::PaymentStatusUnknown(_) => ErrorKind::NetworkFailure,

            CheckoutError::NotReady(_)
            | CheckoutError::CheckoutChanged(_)
            | CheckoutError::AwaitingPayment
            | CheckoutError::PaymentCancelled
            | CheckoutError::Core(_)
            | CheckoutError::InvalidConfig(_)
            | CheckoutError::InvalidUrl(_)
            | CheckoutError::ConfigLoadFailed(_)
            | CheckoutError::ConfigSaveFailed(_) => ErrorKind::ValidationFailure,

            CheckoutError::GatewayNotFound(_)
            | CheckoutError::UnsupportedGateway(_)
            | CheckoutError::GatewayMismatch { .. } => ErrorKind::GatewayMismatch,

            CheckoutError::Cache(_) | CheckoutError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the customer can retry the same step unchanged.
    ///
    /// ## Retryable Errors
    /// - Network failures and timeouts
    /// - Payment sheet failures
    /// - A checkout that changed mid-request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Network(_)
                | CheckoutError::Timeout { .. }
                | CheckoutError::PaymentSheet(_)
                | CheckoutError::CheckoutChanged(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::InvalidConfig(_)
                | CheckoutError::InvalidUrl(_)
                | CheckoutError::ConfigLoadFailed(_)
                | CheckoutError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CheckoutError::Network("502".into()).kind(),
            ErrorKind::NetworkFailure
        );
        assert_eq!(
            CheckoutError::NotReady(vec![PlaceOrderBlocker::MissingDeliveryPlace]).kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            CheckoutError::UnsupportedGateway("paypal".into()).kind(),
            ErrorKind::GatewayMismatch
        );
        assert_eq!(
            CheckoutError::Internal("boom".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CheckoutError::Network("reset".into()).is_retryable());
        assert!(CheckoutError::timeout("capture", Duration::from_secs(30)).is_retryable());

        assert!(!CheckoutError::PaymentCancelled.is_retryable());
        assert!(!CheckoutError::GatewayNotFound("cash".into()).is_retryable());
        assert!(!CheckoutError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = CheckoutError::timeout("capture", Duration::from_secs(30));
        assert_eq!(err.to_string(), "capture timed out after 30 seconds");

        let err = CheckoutError::NotReady(vec![
            PlaceOrderBlocker::EmptyCart,
            PlaceOrderBlocker::NoGateway,
        ]);
        assert_eq!(
            err.to_string(),
            "Order cannot be placed: Your cart is empty; Choose a payment method"
        );

        let err = CheckoutError::mismatch(&GatewayKind::Stripe, "qpay");
        assert!(err.to_string().contains("stripe"));

        let err = CheckoutError::PaymentStatusUnknown("PENDING".into());
        assert_eq!(err.to_string(), "Payment status unknown: PENDING");
    }
}
