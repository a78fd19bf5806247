//! # Checkout Session
//!
//! Mutable checkout state shared by the orchestrator and the cart service.
//!
//! The session lives behind a `tokio::sync::RwLock`. Anything that moves
//! the state machine into a busy state does so while holding the write lock
//! and releases it before awaiting the network, so a concurrent caller sees
//! the busy state instead of racing it.

use std::sync::Arc;

use storefront_core::{
    CheckoutEvent, CheckoutOptions, CheckoutState, Customer, InitializePayload, PaymentGateway,
    Place, QuoteStatus, StoreLocation, StoreOptions,
};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Everything the checkout screen depends on, minus the cart.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    pub state: CheckoutState,
    pub gateways: Vec<PaymentGateway>,
    /// Code of the gateway picked for this checkout.
    pub selected_gateway: Option<String>,
    pub payload: Option<InitializePayload>,
    pub payment_method_label: Option<String>,
    pub customer: Option<Customer>,
    pub deliver_to: Option<Place>,
    pub store_location: Option<StoreLocation>,
    pub store_options: StoreOptions,
    pub options: CheckoutOptions,
    pub quote: QuoteStatus,
    /// Correlates the log lines of one checkout attempt.
    pub attempt: Option<Uuid>,
    /// Bumped whenever tokens are invalidated. Requests compare it on return.
    pub generation: u64,
    /// Bumped whenever a quote input changes. Quote fetches compare it on return.
    pub quote_revision: u64,
}

impl CheckoutSession {
    /// The gateway picked for this checkout.
    pub fn gateway(&self) -> Option<&PaymentGateway> {
        let code = self.selected_gateway.as_deref()?;
        self.gateways.iter().find(|g| g.code == code)
    }

    pub(crate) fn gateway_mut(&mut self) -> Option<&mut PaymentGateway> {
        let code = self.selected_gateway.clone()?;
        self.gateways.iter_mut().find(|g| g.code == code)
    }

    /// Applies `event` to the state machine.
    pub(crate) fn apply(&mut self, event: CheckoutEvent) -> storefront_core::CoreResult<()> {
        let from = self.state.name();
        let name = event.name();
        self.state = self.state.transition(event)?;
        info!(event = name, from, to = self.state.name(), "Checkout transition");
        Ok(())
    }

    /// Drops every checkout token and the payload that came with it.
    pub(crate) fn clear_tokens(&mut self) {
        for gateway in &mut self.gateways {
            gateway.checkout_token = None;
        }
        self.payload = None;
        self.payment_method_label = None;
    }

    /// Drops a quote priced for a cart, store or destination that has since
    /// changed. Delivery goes back to `Pending` until the next refresh.
    pub(crate) fn mark_quote_stale(&mut self) {
        self.quote_revision += 1;
        let next = if self.options.is_pickup || self.deliver_to.is_none() {
            QuoteStatus::NotRequired
        } else {
            QuoteStatus::Pending
        };
        if self.quote != next {
            debug!(from = ?self.quote, to = ?next, "Service quote marked stale");
            self.quote = next;
        }
    }

    /// Invalidates tokens after an input to `initialize` changed.
    ///
    /// Returns true when the state machine went back to gateway selection.
    /// While a capture is in flight, or after completion, only the
    /// generation moves.
    pub(crate) fn invalidate_tokens(&mut self, reason: &str) -> bool {
        self.generation += 1;

        if self.state.is_completed() || matches!(self.state, CheckoutState::Capturing { .. }) {
            debug!(reason, state = self.state.name(), "Tokens kept");
            return false;
        }

        let had_token = self.state.token().is_some();
        match self.state.transition(CheckoutEvent::TokensInvalidated) {
            Ok(next) => {
                self.state = next;
                self.clear_tokens();
                if had_token {
                    info!(reason, "Checkout tokens invalidated");
                }
                had_token
            }
            Err(_) => {
                // an initialize in flight is discarded through `generation`
                debug!(reason, state = self.state.name(), "No tokens to invalidate");
                false
            }
        }
    }
}

/// Shared handle to the session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<CheckoutSession>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, CheckoutSession> {
        self.inner.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, CheckoutSession> {
        self.inner.write().await
    }

    /// A copy of the current session.
    pub async fn snapshot(&self) -> CheckoutSession {
        self.inner.read().await.clone()
    }

    pub async fn state(&self) -> CheckoutState {
        self.inner.read().await.state.clone()
    }

    /// See [`CheckoutSession::invalidate_tokens`].
    pub async fn invalidate_tokens(&self, reason: &str) -> bool {
        self.inner.write().await.invalidate_tokens(reason)
    }
}
