//! # storefront-checkout: Checkout Orchestration for the Storefront
//!
//! Drives a checkout against the storefront backend: the cart, the delivery
//! quote, gateway selection, payment initialization and order capture.
//!
//! ## How It Fits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Orchestration                              │
//! │                                                                         │
//! │   UI ──► CheckoutOrchestrator ──────────────► StorefrontBackend          │
//! │             │   │   │                         (gateways, initialize,    │
//! │             │   │   └── QuoteService ───────►  quote, capture, cart)    │
//! │             │   └────── CartService ────────►                           │
//! │             │                                                           │
//! │             ├── SessionHandle  (state machine, tokens, options)         │
//! │             ├── PaymentSheet   (card SDK seam)                          │
//! │             ├── EventBus       (cart/customer/location/order events)    │
//! │             └── CacheStore     (cart, customer, place, notes)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend and the card SDK sit behind traits so the whole flow runs
//! against fakes in tests.
//!
//! ## Modules
//!
//! - [`orchestrator`] - Gateway selection, place order, QPay notifications
//! - [`cart_service`] - Server-backed cart mutations
//! - [`quote`] - Delivery quotes and nearest store
//! - [`session`] - Shared checkout session
//! - [`backend`] - Storefront backend trait and request timeouts
//! - [`payment`] - Card payment sheet trait
//! - [`events`] - Storefront event bus
//! - [`config`] - Configuration loading
//! - [`error`] - Error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod cart_service;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod payment;
pub mod quote;
pub mod session;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use backend::StorefrontBackend;
pub use cart_service::CartService;
pub use config::{CheckoutConfig, StripeFlow};
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use events::{EventBus, EventEnvelope, StorefrontEvent, Subscription};
pub use orchestrator::{BankLink, CheckoutOrchestrator, CheckoutOrchestratorBuilder};
pub use payment::{NoPaymentSheet, PaymentMethodSelection, PaymentSheet, PaymentSheetSetup};
pub use quote::QuoteService;
pub use session::{CheckoutSession, SessionHandle};
