//! # Cart Service
//!
//! Cart mutations against the backend.
//!
//! ## Mutation Flow
//! ```text
//! add / update / remove / empty
//!      │
//!      ├── validate locally (quantity, required variations, line limits)
//!      ├── backend call (bounded by [timeouts].cart)
//!      ├── replace local cart with the backend's answer
//!      ├── persist to the cache slot            (failure logged only)
//!      ├── invalidate checkout tokens, mark the service quote stale
//!      └── publish cart.updated
//! ```
//!
//! The backend's cart is authoritative. Local validation exists so obvious
//! mistakes fail fast without a round trip.

use std::sync::Arc;
use std::time::Duration;

use storefront_cache::SlotRepository;
use storefront_core::{Cart, CartLine, CoreError, Product, ProductSelection, MAX_LINE_QUANTITY};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::backend::{call_with_timeout, StorefrontBackend};
use crate::error::CheckoutResult;
use crate::events::{EventBus, StorefrontEvent};
use crate::session::SessionHandle;

/// Owns the local copy of the customer's cart.
#[derive(Clone)]
pub struct CartService {
    backend: Arc<dyn StorefrontBackend>,
    cart: Arc<RwLock<Cart>>,
    slots: Option<SlotRepository>,
    events: EventBus,
    session: SessionHandle,
    timeout: Duration,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("timeout", &self.timeout)
            .field("cached", &self.slots.is_some())
            .finish_non_exhaustive()
    }
}

impl CartService {
    pub fn new(
        backend: Arc<dyn StorefrontBackend>,
        cart: Cart,
        slots: Option<SlotRepository>,
        events: EventBus,
        session: SessionHandle,
        timeout: Duration,
    ) -> Self {
        CartService {
            backend,
            cart: Arc::new(RwLock::new(cart)),
            slots,
            events,
            session,
            timeout,
        }
    }

    /// A copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.read().await.clone()
    }

    /// Replaces the cart with the cached one, if the cache has it.
    ///
    /// Returns whether a cached cart was found.
    pub async fn restore(&self) -> bool {
        let Some(slots) = &self.slots else {
            return false;
        };

        match slots.cart().await {
            Ok(Some(cached)) => {
                info!(cart_id = %cached.id, lines = cached.lines.len(), "Cart restored from cache");
                *self.cart.write().await = cached;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not read cached cart");
                false
            }
        }
    }

    /// Adds `quantity` of `product` with the picked options.
    ///
    /// ## Errors
    /// - `Core(RequiredVariationMissing)` when a required option is unset
    /// - `Core(Validation)` for a quantity outside `1..=MAX_LINE_QUANTITY`
    /// - `Core(QuantityTooLarge | CartTooLarge)` when the cart would overflow
    /// - network errors from the backend
    pub async fn add_product(
        &self,
        product: &Product,
        selection: &ProductSelection,
        quantity: i64,
    ) -> CheckoutResult<Cart> {
        let line = CartLine::from_product(product, selection, quantity)?;
        self.add_line(line).await
    }

    /// Adds a prepared line. Identical lines merge.
    pub async fn add_line(&self, line: CartLine) -> CheckoutResult<Cart> {
        let cart = self.snapshot().await;
        // dry run against a copy so limit errors never reach the backend
        cart.clone().push_line(line.clone())?;

        let call = self.backend.add_to_cart(&cart.id, &line);
        let updated = self.run("add to cart", call).await?;
        info!(product_id = %line.product_id, quantity = line.quantity, "Added to cart");
        Ok(self.commit(updated, "cart line added").await)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn update_quantity(&self, line_id: &str, quantity: i64) -> CheckoutResult<Cart> {
        if quantity == 0 {
            return self.remove_line(line_id).await;
        }

        let cart = self.snapshot().await;
        cart.clone().update_quantity(line_id, quantity)?;

        let call = self.backend.update_cart_line(&cart.id, line_id, quantity);
        let updated = self.run("update cart line", call).await?;
        Ok(self.commit(updated, "cart line updated").await)
    }

    /// Adds `delta` (may be negative) to a line's quantity, clamped to the
    /// allowed range. Reaching zero removes the line.
    pub async fn adjust_quantity(&self, line_id: &str, delta: i64) -> CheckoutResult<Cart> {
        let current = self
            .cart
            .read()
            .await
            .line(line_id)
            .map(|l| l.quantity)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;

        let target = (current + delta).clamp(0, MAX_LINE_QUANTITY);
        self.update_quantity(line_id, target).await
    }

    pub async fn remove_line(&self, line_id: &str) -> CheckoutResult<Cart> {
        let cart = self.snapshot().await;
        if cart.line(line_id).is_none() {
            return Err(CoreError::LineNotFound(line_id.to_string()).into());
        }

        let call = self.backend.remove_cart_line(&cart.id, line_id);
        let updated = self.run("remove cart line", call).await?;
        Ok(self.commit(updated, "cart line removed").await)
    }

    /// Empties the cart on the backend.
    pub async fn empty(&self) -> CheckoutResult<Cart> {
        let cart_id = self.cart.read().await.id.clone();

        let call = self.backend.empty_cart(&cart_id);
        let updated = self.run("empty cart", call).await?;
        Ok(self.commit(updated, "cart emptied").await)
    }

    /// Empties the local cart without asking the backend.
    ///
    /// For carts the backend has already let go of: a captured order whose
    /// empty request failed, or a customer signing out.
    pub(crate) async fn clear_local(&self, reason: &str) -> Cart {
        let mut cleared = self.snapshot().await;
        if cleared.is_empty() {
            return cleared;
        }
        cleared.empty();
        info!(cart_id = %cleared.id, reason, "Local cart cleared");
        self.commit(cleared, reason).await
    }

    async fn run<F>(&self, operation: &'static str, call: F) -> CheckoutResult<Cart>
    where
        F: std::future::Future<Output = CheckoutResult<Cart>>,
    {
        call_with_timeout(operation, self.timeout, call)
            .await
            .map_err(|e| {
                error!(operation, error = %e, "Cart request failed");
                e
            })
    }

    /// Stores the backend's cart locally and tells everyone.
    async fn commit(&self, updated: Cart, reason: &str) -> Cart {
        *self.cart.write().await = updated.clone();

        if let Some(slots) = &self.slots {
            if let Err(e) = slots.save_cart(&updated).await {
                warn!(error = %e, "Could not cache cart");
            }
        }

        {
            let mut session = self.session.write().await;
            session.mark_quote_stale();
            session.invalidate_tokens(reason);
        }
        self.events.publish(StorefrontEvent::CartUpdated(updated.clone()));
        updated
    }
}
