//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── CoreError        - Cart rules, tips, illegal checkout transitions │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-cache errors (separate crate)                              │
//! │  └── CacheError       - Local key-value cache failures                 │
//! │                                                                         │
//! │  storefront-checkout errors (separate crate)                           │
//! │  └── CheckoutError    - What the UI sees (network, validation, gateway)│
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → UI alert          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Cart line cannot be found.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart line currency doesn't match the cart.
    #[error("Currency mismatch: cart is {cart}, got {other}")]
    CurrencyMismatch { cart: String, other: String },

    /// Tip text could not be parsed.
    ///
    /// ## When This Occurs
    /// - `"%10"` (percent sign before the digits)
    /// - `"10.5%"` (fractional percentages are not accepted)
    /// - `"abc"` or an empty string
    #[error("Invalid tip '{input}': {reason}")]
    InvalidTip { input: String, reason: String },

    /// A required product variation has no selected option.
    #[error("Required option '{variation}' must be selected")]
    RequiredVariationMissing { variation: String },

    /// Selected option does not belong to the product.
    #[error("Option {option_id} is not available for this product")]
    UnknownOption { option_id: String },

    /// The checkout state machine rejected an event.
    ///
    /// ## When This Occurs
    /// - Capturing while a capture is already in flight
    /// - Placing an order before a gateway produced a checkout token
    /// - Selecting a gateway after the order completed
    #[error("Cannot {event} while checkout is {state}")]
    InvalidTransition { state: String, event: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
