//! # Checkout State Machine
//!
//! Pure transition table for one checkout attempt. The async orchestrator
//! owns the I/O; this module only decides which moves are legal.
//!
//! ## States
//! ```text
//! ┌──────┐ GatewaysLoaded ┌──────────────────┐ GatewaySelected ┌──────────────────────┐
//! │ Idle │───────────────►│ GatewaySelection │────────────────►│ Initializing         │
//! └──────┘                └──────────────────┘                 │ { gateway, None }    │
//!                                  ▲                           └──────────┬───────────┘
//!                                  │ TokensInvalidated                    │ Initialized
//!                                  │                           ┌──────────▼───────────┐
//!                                  ├───────────────────────────│ Initializing         │
//!                                  │                           │ { gateway, Some(t) } │
//!                                  │                           └───┬──────────────┬───┘
//!                                  │          PaymentSheetReady    │              │ CaptureStarted
//!                                  │            (card only)        ▼              │ (cash / QPay)
//!                                  │               ┌─────────────────────────┐    │
//!                                  └───────────────│ AwaitingPaymentConfirm. │    │
//!                                                  └────────────┬────────────┘    │
//!                                                               │ CaptureStarted  │
//!                                                               ▼                 ▼
//!                                                        ┌─────────────┐  Captured  ┌───────────┐
//!                                                        │  Capturing  │───────────►│ Completed │
//!                                                        └─────────────┘            └───────────┘
//!
//!   Any non-terminal state ──Failed──► Failed { resume } ──Retry──► resume
//! ```
//!
//! ## Busy States
//! `Initializing { token: None }` and `Capturing` have a request in flight.
//! The orchestrator commits them before awaiting the network, so a second
//! `place_order` sees `Capturing` and is rejected instead of double-charging.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::gateway::{CheckoutToken, GatewayKind};

// =============================================================================
// State
// =============================================================================

/// Where a checkout attempt stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    /// Gateway options are loaded; waiting for the customer to pick one.
    GatewaySelection,
    /// `initialize` is in flight (`token: None`) or answered.
    ///
    /// Cash and QPay checkouts wait here for "place order" or a payment
    /// notification.
    Initializing {
        gateway: GatewayKind,
        token: Option<CheckoutToken>,
    },
    /// Card sheet is ready; the customer confirms out of band.
    AwaitingPaymentConfirmation {
        gateway: GatewayKind,
        token: CheckoutToken,
    },
    Capturing {
        gateway: GatewayKind,
        token: CheckoutToken,
    },
    Completed {
        order_id: String,
    },
    /// A step failed. `resume` is where [`CheckoutEvent::Retry`] returns to.
    Failed {
        error: String,
        resume: Box<CheckoutState>,
    },
}

impl Default for CheckoutState {
    fn default() -> Self {
        CheckoutState::Idle
    }
}

impl CheckoutState {
    /// Human-readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::GatewaySelection => "selecting a gateway",
            CheckoutState::Initializing { token: None, .. } => "initializing",
            CheckoutState::Initializing { token: Some(_), .. } => "ready to place the order",
            CheckoutState::AwaitingPaymentConfirmation { .. } => "awaiting payment confirmation",
            CheckoutState::Capturing { .. } => "capturing",
            CheckoutState::Completed { .. } => "completed",
            CheckoutState::Failed { .. } => "failed",
        }
    }

    /// A request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CheckoutState::Initializing { token: None, .. } | CheckoutState::Capturing { .. }
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CheckoutState::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckoutState::Failed { .. })
    }

    pub fn gateway(&self) -> Option<&GatewayKind> {
        match self {
            CheckoutState::Initializing { gateway, .. }
            | CheckoutState::AwaitingPaymentConfirmation { gateway, .. }
            | CheckoutState::Capturing { gateway, .. } => Some(gateway),
            CheckoutState::Failed { resume, .. } => resume.gateway(),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&CheckoutToken> {
        match self {
            CheckoutState::Initializing { token, .. } => token.as_ref(),
            CheckoutState::AwaitingPaymentConfirmation { token, .. }
            | CheckoutState::Capturing { token, .. } => Some(token),
            CheckoutState::Failed { resume, .. } => resume.token(),
            _ => None,
        }
    }

    /// True when [`CheckoutEvent::CaptureStarted`] would be accepted.
    pub fn can_capture(&self) -> bool {
        match self {
            CheckoutState::AwaitingPaymentConfirmation { .. } => true,
            CheckoutState::Initializing {
                gateway,
                token: Some(_),
            } => !gateway.requires_payment_sheet(),
            _ => false,
        }
    }

    /// Applies an event, returning the next state.
    ///
    /// ## Errors
    /// `CoreError::InvalidTransition` when the event is illegal here.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::checkout::{CheckoutEvent, CheckoutState};
    /// use storefront_core::gateway::{CheckoutToken, GatewayKind};
    ///
    /// let state = CheckoutState::Idle
    ///     .transition(CheckoutEvent::GatewaysLoaded).unwrap()
    ///     .transition(CheckoutEvent::GatewaySelected { gateway: GatewayKind::Cash }).unwrap();
    /// assert!(state.is_busy());
    ///
    /// let state = state
    ///     .transition(CheckoutEvent::Initialized { token: CheckoutToken::new("tok") }).unwrap();
    /// assert!(state.can_capture());
    ///
    /// let capturing = state.transition(CheckoutEvent::CaptureStarted).unwrap();
    /// assert!(capturing.transition(CheckoutEvent::CaptureStarted).is_err());
    /// ```
    pub fn transition(&self, event: CheckoutEvent) -> CoreResult<CheckoutState> {
        use CheckoutEvent as E;
        use CheckoutState as S;

        let next = match (self, &event) {
            (S::Idle | S::GatewaySelection, E::GatewaysLoaded) => S::GatewaySelection,

            (
                S::GatewaySelection
                | S::Initializing { token: Some(_), .. }
                | S::AwaitingPaymentConfirmation { .. },
                E::GatewaySelected { gateway },
            ) => S::Initializing {
                gateway: gateway.clone(),
                token: None,
            },

            (S::Initializing { gateway, token: None }, E::Initialized { token }) => S::Initializing {
                gateway: gateway.clone(),
                token: Some(token.clone()),
            },

            (
                S::Initializing {
                    gateway,
                    token: Some(token),
                },
                E::PaymentSheetReady,
            ) if gateway.requires_payment_sheet() => S::AwaitingPaymentConfirmation {
                gateway: gateway.clone(),
                token: token.clone(),
            },

            (S::AwaitingPaymentConfirmation { gateway, token }, E::CaptureStarted) => S::Capturing {
                gateway: gateway.clone(),
                token: token.clone(),
            },
            (
                S::Initializing {
                    gateway,
                    token: Some(token),
                },
                E::CaptureStarted,
            ) if !gateway.requires_payment_sheet() => S::Capturing {
                gateway: gateway.clone(),
                token: token.clone(),
            },

            (S::Capturing { .. }, E::Captured { order_id }) => S::Completed {
                order_id: order_id.clone(),
            },

            (S::Completed { .. } | S::Failed { .. }, E::Failed { .. }) => {
                return Err(self.reject(&event));
            }
            (_, E::Failed { error }) => S::Failed {
                error: error.clone(),
                resume: Box::new(self.resume_point()),
            },

            (S::Failed { resume, .. }, E::Retry) => (**resume).clone(),

            (
                S::Initializing { token: Some(_), .. }
                | S::AwaitingPaymentConfirmation { .. },
                E::TokensInvalidated,
            ) => S::GatewaySelection,
            (S::Failed { resume, .. }, E::TokensInvalidated) if resume.token().is_some() => {
                S::GatewaySelection
            }
            (S::Idle | S::GatewaySelection, E::TokensInvalidated) => self.clone(),

            // A capture in flight must finish or fail before the session can drop it
            (S::Capturing { .. }, E::Reset) => return Err(self.reject(&event)),
            (_, E::Reset) => S::Idle,

            _ => return Err(self.reject(&event)),
        };

        Ok(next)
    }

    /// Where a retry should land if the step leaving this state fails.
    fn resume_point(&self) -> CheckoutState {
        match self {
            CheckoutState::Initializing { token: None, .. } => CheckoutState::GatewaySelection,
            CheckoutState::Capturing { gateway, token } if gateway.requires_payment_sheet() => {
                CheckoutState::AwaitingPaymentConfirmation {
                    gateway: gateway.clone(),
                    token: token.clone(),
                }
            }
            CheckoutState::Capturing { gateway, token } => CheckoutState::Initializing {
                gateway: gateway.clone(),
                token: Some(token.clone()),
            },
            other => other.clone(),
        }
    }

    fn reject(&self, event: &CheckoutEvent) -> CoreError {
        CoreError::InvalidTransition {
            state: self.name().to_string(),
            event: event.name().to_string(),
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Events
// =============================================================================

/// Something that happened to the checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    GatewaysLoaded,
    GatewaySelected { gateway: GatewayKind },
    Initialized { token: CheckoutToken },
    PaymentSheetReady,
    CaptureStarted,
    Captured { order_id: String },
    Failed { error: String },
    Retry,
    /// The cart changed, so any token no longer matches it.
    TokensInvalidated,
    Reset,
}

impl CheckoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::GatewaysLoaded => "load gateways",
            CheckoutEvent::GatewaySelected { .. } => "select a gateway",
            CheckoutEvent::Initialized { .. } => "finish initializing",
            CheckoutEvent::PaymentSheetReady => "present the payment sheet",
            CheckoutEvent::CaptureStarted => "capture order",
            CheckoutEvent::Captured { .. } => "complete the order",
            CheckoutEvent::Failed { .. } => "record a failure",
            CheckoutEvent::Retry => "retry",
            CheckoutEvent::TokensInvalidated => "invalidate tokens",
            CheckoutEvent::Reset => "reset",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
