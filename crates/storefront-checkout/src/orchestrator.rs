//! # Checkout Orchestrator
//!
//! Drives one checkout from gateway selection to a captured order.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Orchestration                           │
//! │                                                                         │
//! │  load_gateways()                Idle ──► GatewaySelection               │
//! │       │                                                                 │
//! │  select_gateway(code)           ──► Initializing { token: None }        │
//! │       │  initialize(customer, cart, quote, gateway, order_options)     │
//! │       ▼                         ──► Initializing { token }              │
//! │  ┌────────────┬─────────────────┬──────────────────────────┐            │
//! │  │ card       │ cash            │ qpay                     │            │
//! │  │ sheet init │                 │ invoice + bank links     │            │
//! │  │ ──► Awaiting│                │                          │            │
//! │  │ present()  │                 │ handle_qpay_payment /    │            │
//! │  │ place_order│ place_order     │ check_qpay_payment(PAID) │            │
//! │  └─────┬──────┴───────┬─────────┴────────────┬─────────────┘            │
//! │        └──────────────┼──────────────────────┘                          │
//! │                       ▼                                                 │
//! │                  Capturing ──► capture_order(token, notes)              │
//! │                       │                                                 │
//! │            ┌──────────┴──────────┐                                      │
//! │            ▼                     ▼                                      │
//! │        Completed              Failed { resume }                         │
//! │   empty cart, publish     cart untouched, retry() resumes               │
//! │   order.completed                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Busy states (`Initializing` without a token, `Capturing`) are committed
//! under the session write lock before the backend is awaited. A second
//! `place_order` arriving mid-capture finds the session busy and is
//! rejected instead of capturing twice. `reset` is refused the same way, so
//! an order the backend captured always ends with an empty cart.

use std::sync::Arc;

use storefront_cache::{CacheStore, SlotRepository};
use storefront_core::gateway::{QpayInvoice, QpayNotification};
use storefront_core::validation::validate_order_notes;
use storefront_core::{
    calculate_total, find_gateway, CaptureOptions, Cart, CheckoutEvent, CheckoutOptions,
    CheckoutState, CheckoutToken, CheckoutTotals, CoreError, Customer, GatewayKind,
    InitializePayload, Money, Order, OrderOptions, PaymentGateway, Place, PlaceOrderBlocker,
    PlaceOrderCheck, QuoteStatus, StoreLocation, StoreOptions,
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::{call_with_timeout, StorefrontBackend};
use crate::cart_service::CartService;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{EventBus, StorefrontEvent};
use crate::payment::{NoPaymentSheet, PaymentSheet, PaymentSheetSetup};
use crate::quote::QuoteService;
use crate::session::{CheckoutSession, SessionHandle};

/// A QPay bank app link that parsed as a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankLink {
    pub name: String,
    pub logo: String,
    pub url: Url,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Async driver around the checkout state machine.
pub struct CheckoutOrchestrator {
    config: CheckoutConfig,
    backend: Arc<dyn StorefrontBackend>,
    payment_sheet: Arc<dyn PaymentSheet>,
    slots: Option<SlotRepository>,
    events: EventBus,
    session: SessionHandle,
    cart: CartService,
    quotes: QuoteService,
}

impl std::fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("config", &self.config)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl CheckoutOrchestrator {
    pub fn builder(
        config: CheckoutConfig,
        backend: Arc<dyn StorefrontBackend>,
    ) -> CheckoutOrchestratorBuilder {
        CheckoutOrchestratorBuilder::new(config, backend)
    }

    pub fn cart(&self) -> &CartService {
        &self.cart
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub async fn state(&self) -> CheckoutState {
        self.session.state().await
    }

    // =========================================================================
    // Session Inputs
    // =========================================================================

    /// Loads the cached cart, customer, delivery place and store location.
    ///
    /// Cache failures are logged; whatever could be read is kept.
    pub async fn restore(&self) {
        self.cart.restore().await;

        let Some(slots) = &self.slots else {
            return;
        };

        let customer = slots.customer().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read cached customer");
            None
        });
        let deliver_to = slots.deliver_to().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read cached delivery place");
            None
        });
        let store_location = slots.store_location().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read cached store location");
            None
        });

        let mut session = self.session.write().await;
        session.customer = customer;
        session.deliver_to = deliver_to;
        session.store_location = store_location;
        debug!(
            customer = session.customer.is_some(),
            deliver_to = session.deliver_to.is_some(),
            "Session restored from cache"
        );
    }

    /// Signs a customer in (`Some`) or out (`None`).
    ///
    /// Signing out also forgets the delivery place and the local cart, the
    /// same things dropped from the cache.
    pub async fn set_customer(&self, customer: Option<Customer>) {
        {
            let mut session = self.session.write().await;
            session.customer = customer.clone();
            if customer.is_none() {
                session.deliver_to = None;
                session.mark_quote_stale();
            }
            session.invalidate_tokens("customer changed");
        }

        if customer.is_none() {
            self.cart.clear_local("signed out").await;
        }

        if let Some(slots) = &self.slots {
            let result = match &customer {
                Some(customer) => slots.save_customer(customer).await,
                None => slots.sign_out().await,
            };
            if let Err(e) = result {
                warn!(error = %e, "Could not cache customer");
            }
        }

        self.events.publish(StorefrontEvent::CustomerUpdated(customer));
    }

    pub async fn set_deliver_to(&self, place: Place) {
        {
            let mut session = self.session.write().await;
            session.deliver_to = Some(place.clone());
            session.mark_quote_stale();
            session.invalidate_tokens("delivery place changed");
        }

        if let Some(slots) = &self.slots {
            if let Err(e) = slots.save_deliver_to(&place).await {
                warn!(error = %e, "Could not cache delivery place");
            }
        }

        self.events.publish(StorefrontEvent::LocationUpdated(place));
    }

    pub async fn set_store_location(&self, location: StoreLocation) {
        {
            let mut session = self.session.write().await;
            session.store_location = Some(location.clone());
            session.mark_quote_stale();
            session.invalidate_tokens("store location changed");
        }

        if let Some(slots) = &self.slots {
            if let Err(e) = slots.save_store_location(&location).await {
                warn!(error = %e, "Could not cache store location");
            }
        }
    }

    /// Picks the location nearest to the delivery place and makes it current.
    ///
    /// Without delivery coordinates the first location is used.
    pub async fn choose_nearest_store(&self, locations: &[StoreLocation]) -> Option<StoreLocation> {
        let origin = self
            .session
            .read()
            .await
            .deliver_to
            .as_ref()
            .and_then(|place| place.location);

        let chosen = match origin {
            Some(origin) => QuoteService::nearest(locations, &origin),
            None => locations.first(),
        }?
        .clone();

        info!(store = %chosen.id, "Store location chosen");
        self.set_store_location(chosen.clone()).await;
        Some(chosen)
    }

    /// Applies the store's feature flags to the current options.
    pub async fn set_store_options(&self, store: StoreOptions) -> CheckoutOptions {
        let mut session = self.session.write().await;
        session.store_options = store;

        let mut options = session.options;
        if self.config.storefront.prioritize_pickup && store.pickup_enabled {
            options.is_pickup = true;
        }
        Self::apply_options(&mut session, options)
    }

    /// Sets tip, delivery tip and pickup, constrained by the store options.
    ///
    /// Returns the options actually in effect.
    pub async fn set_options(&self, options: CheckoutOptions) -> CheckoutOptions {
        let mut session = self.session.write().await;
        Self::apply_options(&mut session, options)
    }

    fn apply_options(session: &mut CheckoutSession, requested: CheckoutOptions) -> CheckoutOptions {
        let effective = requested.constrained_by(&session.store_options);
        if effective != session.options {
            let fulfilment_changed = effective.is_pickup != session.options.is_pickup;
            session.options = effective;
            if fulfilment_changed {
                session.mark_quote_stale();
            }
            session.invalidate_tokens("checkout options changed");
        }
        effective
    }

    pub async fn save_order_notes(&self, notes: &str) -> CheckoutResult<()> {
        let notes = validate_order_notes(notes).map_err(CoreError::from)?;
        let Some(slots) = &self.slots else {
            return Ok(());
        };
        let customer_id = self.customer_id().await;
        slots.save_order_notes(customer_id.as_deref(), &notes).await?;
        Ok(())
    }

    pub async fn order_notes(&self) -> String {
        let Some(slots) = &self.slots else {
            return String::new();
        };
        let customer_id = self.customer_id().await;
        slots
            .order_notes(customer_id.as_deref())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Could not read order notes");
                String::new()
            })
    }

    async fn customer_id(&self) -> Option<String> {
        self.session.read().await.customer.as_ref().map(|c| c.id.clone())
    }

    // =========================================================================
    // Totals & Quote
    // =========================================================================

    /// Line-item breakdown for the checkout screen.
    pub async fn totals(&self) -> CheckoutTotals {
        let cart = self.cart.snapshot().await;
        let session = self.session.read().await;
        CheckoutTotals::compute(&cart, &session.options, &session.quote)
    }

    pub async fn total(&self) -> Money {
        let cart = self.cart.snapshot().await;
        let session = self.session.read().await;
        calculate_total(&cart, &session.options, session.quote.quote())
    }

    /// Re-fetches the service quote for the current cart and destination.
    ///
    /// Never fails: a failed fetch is recorded as `QuoteStatus::Failed`.
    /// A result whose cart, store or destination changed during the fetch is
    /// dropped and the quote stays stale.
    pub async fn refresh_quote(&self) -> QuoteStatus {
        let revision = self.session.read().await.quote_revision;
        let cart = self.cart.snapshot().await;
        let (origin, destination) = {
            let mut session = self.session.write().await;
            if session.options.is_pickup {
                session.quote = QuoteStatus::NotRequired;
                return QuoteStatus::NotRequired;
            }
            let Some(destination) = session.deliver_to.clone() else {
                session.quote = QuoteStatus::NotRequired;
                return QuoteStatus::NotRequired;
            };
            let Some(origin) = session.store_location.clone() else {
                let status = QuoteStatus::Failed("No store location selected".to_string());
                session.quote = status.clone();
                return status;
            };
            session.quote = QuoteStatus::Pending;
            (origin, destination)
        };

        let status = self.quotes.refresh(&origin, Some(&destination), &cart).await;

        let mut session = self.session.write().await;
        if session.quote_revision != revision {
            debug!("Quote inputs changed while fetching, result dropped");
            return session.quote.clone();
        }
        let previous = session.state.token().map(|_| session.quote.clone());
        session.quote = status.clone();
        if let Some(QuoteStatus::Ready(previous)) = previous {
            if status.quote() != Some(&previous) {
                session.invalidate_tokens("service quote changed");
            }
        }
        status
    }

    // =========================================================================
    // Gateways
    // =========================================================================

    /// Fetches the store's gateways and moves to gateway selection.
    pub async fn load_gateways(&self) -> CheckoutResult<Vec<PaymentGateway>> {
        self.session
            .read()
            .await
            .state
            .transition(CheckoutEvent::GatewaysLoaded)?;

        let call = self.backend.get_payment_gateways();
        let gateways = call_with_timeout("load gateways", self.config.timeouts.gateways(), call)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not load payment gateways");
                e
            })?;

        let mut session = self.session.write().await;
        session.apply(CheckoutEvent::GatewaysLoaded)?;
        session.gateways = gateways.clone();
        if session
            .selected_gateway
            .as_deref()
            .is_some_and(|code| find_gateway(&gateways, code).is_none())
        {
            session.selected_gateway = None;
        }
        info!(count = gateways.len(), "Payment gateways loaded");
        Ok(gateways)
    }

    /// The gateway named by `[storefront].payment_gateway`, if offered.
    pub async fn default_gateway(&self) -> Option<PaymentGateway> {
        let session = self.session.read().await;
        find_gateway(&session.gateways, self.config.payment_gateway()).cloned()
    }

    /// Picks a gateway and initializes the checkout on it.
    ///
    /// ## Errors
    /// - `GatewayNotFound` / `UnsupportedGateway` for an unusable code
    /// - `NotReady` without a signed-in customer or with an empty cart
    /// - `Core(InvalidTransition)` while another step is in flight
    /// - network errors and timeouts from `initialize` (state becomes `Failed`)
    /// - `GatewayMismatch` when the payload belongs to another gateway
    /// - `CheckoutChanged` when an input changed while initializing
    pub async fn select_gateway(&self, code: &str) -> CheckoutResult<InitializePayload> {
        // read before the cart so a cart commit in between shows up as a new generation
        let generation = self.session.read().await.generation;
        let cart = self.cart.snapshot().await;

        let (gateway, customer, quote, order_options, attempt) = {
            let mut session = self.session.write().await;
            if session.generation != generation {
                return Err(CheckoutError::CheckoutChanged("reading the cart"));
            }

            let gateway = find_gateway(&session.gateways, code)
                .cloned()
                .ok_or_else(|| CheckoutError::GatewayNotFound(code.to_string()))?;
            if let GatewayKind::Other(kind) = &gateway.kind {
                return Err(CheckoutError::UnsupportedGateway(kind.clone()));
            }

            let customer = session
                .customer
                .clone()
                .filter(Customer::is_authenticated)
                .ok_or_else(|| CheckoutError::NotReady(vec![PlaceOrderBlocker::NotAuthenticated]))?;
            if cart.is_empty() {
                return Err(CheckoutError::NotReady(vec![PlaceOrderBlocker::EmptyCart]));
            }

            if session.state.is_failed() {
                session.apply(CheckoutEvent::Retry)?;
            }
            session.apply(CheckoutEvent::GatewaySelected {
                gateway: gateway.kind.clone(),
            })?;

            session.clear_tokens();
            session.selected_gateway = Some(gateway.code.clone());
            let attempt = Uuid::new_v4();
            session.attempt = Some(attempt);

            let quote = session
                .options
                .is_delivery()
                .then(|| session.quote.quote().cloned())
                .flatten();
            let order_options = OrderOptions::for_checkout(&session.options, &gateway.kind);

            (gateway, customer, quote, order_options, attempt)
        };

        info!(%attempt, gateway = %gateway.code, cash = order_options.cash, "Initializing checkout");

        let call = self
            .backend
            .initialize(&customer, &cart, quote.as_ref(), &gateway, &order_options);
        let payload = match call_with_timeout("initialize", self.config.timeouts.initialize(), call).await
        {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail(e).await),
        };

        if !payload.matches(&gateway.kind) {
            let actual = payload_kind(&payload);
            return Err(self.fail(CheckoutError::mismatch(&gateway.kind, actual)).await);
        }

        {
            let mut session = self.session.write().await;
            if session.generation != generation {
                warn!(%attempt, "Checkout changed while initializing, discarding token");
                session.apply(CheckoutEvent::Failed {
                    error: "checkout changed while preparing payment".to_string(),
                })?;
                return Err(CheckoutError::CheckoutChanged("preparing payment"));
            }

            let token = payload.token().clone();
            session.apply(CheckoutEvent::Initialized {
                token: token.clone(),
            })?;
            if let Some(selected) = session.gateway_mut() {
                selected.checkout_token = Some(token);
            }
            session.payload = Some(payload.clone());
        }

        if let InitializePayload::Card { .. } = &payload {
            self.prepare_card(&payload, generation).await?;
        }

        info!(%attempt, gateway = %gateway.code, "Checkout initialized");
        Ok(payload)
    }

    async fn prepare_card(&self, payload: &InitializePayload, generation: u64) -> CheckoutResult<()> {
        let InitializePayload::Card {
            payment_intent,
            ephemeral_key,
            customer_id,
            ..
        } = payload
        else {
            return Ok(());
        };

        if self.config.stripe_flow().uses_payment_sheet() {
            let setup = PaymentSheetSetup {
                payment_intent: payment_intent.clone(),
                ephemeral_key: ephemeral_key.clone(),
                customer_id: customer_id.clone(),
                merchant_display_name: self.config.stripe.merchant_display_name.clone(),
                merchant_country_code: self.config.stripe.merchant_country_code.clone(),
                return_url: self.config.return_url()?,
            };
            if let Err(e) = self.payment_sheet.init_payment_sheet(&setup).await {
                return Err(self.fail(e).await);
            }
        }

        let mut session = self.session.write().await;
        if session.generation != generation {
            return Err(CheckoutError::CheckoutChanged("preparing payment"));
        }
        session.apply(CheckoutEvent::PaymentSheetReady)?;
        Ok(())
    }

    /// Shows the card sheet and records the chosen card's label.
    pub async fn present_payment_sheet(&self) -> CheckoutResult<String> {
        {
            let session = self.session.read().await;
            let kind = session.state.gateway().cloned();
            if kind != Some(GatewayKind::Stripe) {
                let actual = kind.map(|k| k.to_string()).unwrap_or_else(|| "none".into());
                return Err(CheckoutError::mismatch(&GatewayKind::Stripe, actual));
            }
            if !matches!(session.state, CheckoutState::AwaitingPaymentConfirmation { .. }) {
                return Err(CoreError::InvalidTransition {
                    state: session.state.name().to_string(),
                    event: "present payment sheet".to_string(),
                }
                .into());
            }
        }

        let selection = self.payment_sheet.present_payment_sheet().await.map_err(|e| {
            error!(error = %e, "Payment sheet failed");
            e
        })?;
        let Some(selection) = selection else {
            info!("Payment sheet dismissed");
            return Err(CheckoutError::PaymentCancelled);
        };

        self.set_payment_method_label(&selection.label).await;
        Ok(selection.label)
    }

    /// Records the card entered in the inline card field.
    pub async fn set_payment_method_label(&self, label: &str) {
        let label = label.trim();
        self.session.write().await.payment_method_label =
            (!label.is_empty()).then(|| label.to_string());
    }

    // =========================================================================
    // Place Order
    // =========================================================================

    /// Every reason "place order" is currently disabled.
    pub async fn blockers(&self) -> Vec<PlaceOrderBlocker> {
        let cart = self.cart.snapshot().await;
        let session = self.session.read().await;
        place_order_check(&session, &cart).blockers()
    }

    pub async fn can_place_order(&self) -> bool {
        self.blockers().await.is_empty()
    }

    /// Captures the order on the selected cash or card gateway.
    ///
    /// ## Errors
    /// - `NotReady` listing every blocker
    /// - `AwaitingPayment` for QPay, which captures on payment
    /// - `Core(Validation)` for notes longer than the allowed maximum
    /// - `PaymentSheet` when the card confirmation fails
    /// - network errors and timeouts from `capture_order`
    ///
    /// On failure the cart and the checkout token are kept; the same call
    /// (or [`retry`](Self::retry)) tries again.
    pub async fn place_order(&self, notes: Option<&str>) -> CheckoutResult<Order> {
        let cart = self.cart.snapshot().await;

        let (token, kind, options) = {
            let mut session = self.session.write().await;

            let blockers = place_order_check(&session, &cart).blockers();
            if !blockers.is_empty() {
                warn!(?blockers, "Place order rejected");
                return Err(CheckoutError::NotReady(blockers));
            }

            let kind = session.state.gateway().cloned().ok_or_else(|| {
                CheckoutError::Internal("initialized checkout without a gateway".into())
            })?;
            if kind == GatewayKind::Qpay {
                return Err(CheckoutError::AwaitingPayment);
            }

            let options = capture_options(notes)?;

            if session.state.is_failed() {
                session.apply(CheckoutEvent::Retry)?;
            }
            session.apply(CheckoutEvent::CaptureStarted)?;
            let token = session.state.token().cloned().ok_or_else(|| {
                CheckoutError::Internal("capturing without a checkout token".into())
            })?;
            (token, kind, options)
        };

        if kind.requires_payment_sheet() {
            if let Err(e) = self.payment_sheet.confirm_payment().await {
                return Err(self.fail(e).await);
            }
        }

        self.capture(token, options).await
    }

    async fn capture(&self, token: CheckoutToken, options: CaptureOptions) -> CheckoutResult<Order> {
        let call = self.backend.capture_order(&token, &options);
        let order = match call_with_timeout("capture", self.config.timeouts.capture(), call).await {
            Ok(order) => order,
            Err(e) => return Err(self.fail(e).await),
        };

        // the backend has the order, nothing below may bail out
        let customer_id = {
            let mut session = self.session.write().await;
            if let Err(e) = session.apply(CheckoutEvent::Captured {
                order_id: order.id.clone(),
            }) {
                error!(order_id = %order.id, error = %e, "Captured order not recorded on state machine");
            }
            session.clear_tokens();
            session.customer.as_ref().map(|c| c.id.clone())
        };
        info!(order_id = %order.id, display_id = %order.display_id(), "Order captured");

        if let Err(e) = self.cart.empty().await {
            error!(order_id = %order.id, error = %e, "Could not empty cart after capture");
            self.cart.clear_local("order captured").await;
        }

        if let Some(slots) = &self.slots {
            if let Err(e) = slots.save_order_notes(customer_id.as_deref(), "").await {
                warn!(error = %e, "Could not clear order notes");
            }
        }

        self.events.publish(StorefrontEvent::OrderCompleted(order.clone()));
        Ok(order)
    }

    /// Records a failure on the state machine and hands the error back.
    async fn fail(&self, err: CheckoutError) -> CheckoutError {
        let mut session = self.session.write().await;
        let attempt = session.attempt;
        error!(attempt = ?attempt, state = session.state.name(), error = %err, "Checkout step failed");

        if let Err(e) = session.apply(CheckoutEvent::Failed {
            error: err.to_string(),
        }) {
            debug!(error = %e, "Failure not recorded on state machine");
        }
        err
    }

    // =========================================================================
    // QPay
    // =========================================================================

    pub async fn qpay_invoice(&self) -> Option<QpayInvoice> {
        match &self.session.read().await.payload {
            Some(InitializePayload::Qpay { invoice, .. }) => Some(invoice.clone()),
            _ => None,
        }
    }

    /// Bank app deep links for the current QPay invoice. Unparseable links
    /// are skipped.
    pub async fn qpay_bank_links(&self) -> Vec<BankLink> {
        let Some(invoice) = self.qpay_invoice().await else {
            return Vec::new();
        };

        invoice
            .urls
            .into_iter()
            .filter_map(|link| match Url::parse(&link.link) {
                Ok(url) => Some(BankLink {
                    name: link.name,
                    logo: link.logo,
                    url,
                }),
                Err(e) => {
                    warn!(bank = %link.name, error = %e, "Skipping invalid bank link");
                    None
                }
            })
            .collect()
    }

    /// Reacts to a QPay payment notification.
    ///
    /// ## Rules
    /// - `PAYMENT_NOTFOUND` is ignored (`Ok(None)`)
    /// - `PAID` captures the order exactly once; repeats return `Ok(None)`
    /// - any other status or error is `PaymentStatusUnknown`
    pub async fn handle_qpay_payment(
        &self,
        notification: &QpayNotification,
        notes: Option<&str>,
    ) -> CheckoutResult<Option<Order>> {
        if let Some(err) = &notification.error {
            if err.is_not_found() {
                debug!("QPay payment not found yet");
                return Ok(None);
            }
            warn!(error = %err.error, "QPay reported an error");
            return Err(CheckoutError::PaymentStatusUnknown(err.error.clone()));
        }

        let Some(payment) = &notification.payment else {
            return Ok(None);
        };
        if !payment.is_paid() {
            warn!(status = %payment.payment_status, "QPay payment not settled");
            return Err(CheckoutError::PaymentStatusUnknown(
                payment.payment_status.clone(),
            ));
        }

        let (token, options) = {
            let mut session = self.session.write().await;
            match &session.state {
                CheckoutState::Capturing { .. } | CheckoutState::Completed { .. } => {
                    debug!("Duplicate QPay payment notification ignored");
                    return Ok(None);
                }
                state if state.gateway() != Some(&GatewayKind::Qpay) => {
                    let actual = state
                        .gateway()
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "none".into());
                    return Err(CheckoutError::mismatch(&GatewayKind::Qpay, actual));
                }
                _ => {}
            }

            let options = capture_options(notes)?;
            if session.state.is_failed() {
                session.apply(CheckoutEvent::Retry)?;
            }
            session.apply(CheckoutEvent::CaptureStarted)?;
            let token = session.state.token().cloned().ok_or_else(|| {
                CheckoutError::Internal("capturing without a checkout token".into())
            })?;
            (token, options)
        };

        info!(payment_id = ?payment.payment_id, "QPay payment received");
        self.capture(token, options).await.map(Some)
    }

    /// Asks the backend whether the QPay invoice was paid.
    pub async fn check_qpay_payment(&self, notes: Option<&str>) -> CheckoutResult<Option<Order>> {
        let checkout_id = {
            let session = self.session.read().await;
            match &session.payload {
                Some(InitializePayload::Qpay { checkout_id, .. }) => checkout_id.clone(),
                other => {
                    let actual = other.as_ref().map(payload_kind).unwrap_or("none");
                    return Err(CheckoutError::mismatch(&GatewayKind::Qpay, actual));
                }
            }
        };

        let call = self.backend.check_qpay_payment(&checkout_id);
        let notification =
            call_with_timeout("qpay payment check", self.config.timeouts.initialize(), call)
                .await?;
        self.handle_qpay_payment(&notification, notes).await
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Returns a failed checkout to the step before the failure.
    pub async fn retry(&self) -> CheckoutResult<CheckoutState> {
        let mut session = self.session.write().await;
        session.apply(CheckoutEvent::Retry)?;
        Ok(session.state.clone())
    }

    /// Drops checkout tokens after an `initialize` input changed.
    pub async fn invalidate_tokens(&self) -> bool {
        self.session.invalidate_tokens("invalidated by caller").await
    }

    /// Starts over. Gateways must be loaded again.
    pub async fn reset(&self) -> CheckoutResult<()> {
        let mut session = self.session.write().await;
        session.apply(CheckoutEvent::Reset)?;
        session.clear_tokens();
        session.selected_gateway = None;
        session.attempt = None;
        Ok(())
    }
}

fn place_order_check<'a>(session: &'a CheckoutSession, cart: &'a Cart) -> PlaceOrderCheck<'a> {
    PlaceOrderCheck {
        state: &session.state,
        customer: session.customer.as_ref(),
        cart,
        is_pickup: session.options.is_pickup,
        deliver_to: session.deliver_to.as_ref(),
        gateway: session.gateway(),
        payment_method_label: session.payment_method_label.as_deref(),
        quote: &session.quote,
    }
}

fn capture_options(notes: Option<&str>) -> CheckoutResult<CaptureOptions> {
    match notes {
        Some(notes) => {
            let notes = validate_order_notes(notes).map_err(CoreError::from)?;
            Ok(CaptureOptions::with_notes(notes))
        }
        None => Ok(CaptureOptions::default()),
    }
}

fn payload_kind(payload: &InitializePayload) -> &'static str {
    match payload {
        InitializePayload::Card { .. } => "stripe",
        InitializePayload::Qpay { .. } => "qpay",
        InitializePayload::Cash { .. } => "cash",
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`CheckoutOrchestrator`].
pub struct CheckoutOrchestratorBuilder {
    config: CheckoutConfig,
    backend: Arc<dyn StorefrontBackend>,
    payment_sheet: Option<Arc<dyn PaymentSheet>>,
    cache: Option<CacheStore>,
    events: Option<EventBus>,
    cart: Option<Cart>,
}

impl CheckoutOrchestratorBuilder {
    pub fn new(config: CheckoutConfig, backend: Arc<dyn StorefrontBackend>) -> Self {
        CheckoutOrchestratorBuilder {
            config,
            backend,
            payment_sheet: None,
            cache: None,
            events: None,
            cart: None,
        }
    }

    pub fn with_payment_sheet(mut self, sheet: Arc<dyn PaymentSheet>) -> Self {
        self.payment_sheet = Some(sheet);
        self
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Starting cart. Defaults to an empty USD cart.
    pub fn with_cart(mut self, cart: Cart) -> Self {
        self.cart = Some(cart);
        self
    }

    /// ## Errors
    /// Configuration validation errors.
    pub fn build(self) -> CheckoutResult<CheckoutOrchestrator> {
        self.config.validate()?;

        let events = self.events.unwrap_or_default();
        let session = SessionHandle::new();
        let slots = self.cache.as_ref().map(CacheStore::slots);

        let cart = CartService::new(
            self.backend.clone(),
            self.cart.unwrap_or_else(|| Cart::new("USD")),
            slots.clone(),
            events.clone(),
            session.clone(),
            self.config.timeouts.cart(),
        );
        let quotes = QuoteService::new(self.backend.clone(), self.config.timeouts.quote());

        Ok(CheckoutOrchestrator {
            payment_sheet: self
                .payment_sheet
                .unwrap_or_else(|| Arc::new(NoPaymentSheet)),
            config: self.config,
            backend: self.backend,
            slots,
            events,
            session,
            cart,
            quotes,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
