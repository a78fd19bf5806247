//! # Service Quotes
//!
//! Fetches the delivery fee for the current cart and destination.
//!
//! ```text
//!   pickup / no destination ──► NotRequired
//!   destination set         ──► Pending ──► fetch_service_quote ──┬──► Ready(quote)
//!                                  (bounded by [timeouts].quote) └──► Failed(message)
//! ```
//!
//! A failed fetch never propagates as an error: it becomes
//! `QuoteStatus::Failed`, which blocks "place order" until a later refresh
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use storefront_core::types::nearest_store_location;
use storefront_core::{Cart, Coordinates, Place, QuoteStatus, StoreLocation};
use tracing::{debug, error, info};

use crate::backend::{call_with_timeout, StorefrontBackend};

/// Stateless quote fetcher.
#[derive(Clone)]
pub struct QuoteService {
    backend: Arc<dyn StorefrontBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for QuoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl QuoteService {
    pub fn new(backend: Arc<dyn StorefrontBackend>, timeout: Duration) -> Self {
        QuoteService { backend, timeout }
    }

    /// Fetches a fresh quote from `store_location` to `destination`.
    ///
    /// `destination: None` means pickup and yields `NotRequired`. An empty
    /// cart is not quoted either.
    pub async fn refresh(
        &self,
        store_location: &StoreLocation,
        destination: Option<&Place>,
        cart: &Cart,
    ) -> QuoteStatus {
        let Some(destination) = destination else {
            return QuoteStatus::NotRequired;
        };

        if cart.is_empty() {
            debug!("Cart is empty, skipping service quote");
            return QuoteStatus::NotRequired;
        }

        if !destination.is_deliverable() {
            return QuoteStatus::Failed("Delivery address has no location".to_string());
        }

        let call = self.backend.fetch_service_quote(store_location, destination, cart);
        match call_with_timeout("service quote", self.timeout, call).await {
            Ok(quote) => {
                info!(
                    store = %store_location.id,
                    amount = quote.amount.minor(),
                    "Service quote ready"
                );
                QuoteStatus::Ready(quote)
            }
            Err(e) => {
                error!(store = %store_location.id, error = %e, "Service quote failed");
                QuoteStatus::Failed(e.to_string())
            }
        }
    }

    /// Picks the store location closest to `destination`.
    pub fn nearest<'a>(
        locations: &'a [StoreLocation],
        destination: &Coordinates,
    ) -> Option<&'a StoreLocation> {
        nearest_store_location(locations, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, FakeBackend};
    use storefront_core::Money;

    fn service(backend: &Arc<FakeBackend>, secs: u64) -> QuoteService {
        QuoteService::new(backend.clone(), Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn test_pickup_needs_no_quote() {
        let backend = Arc::new(FakeBackend::new());
        let status = service(&backend, 5)
            .refresh(&fixtures::store_location(), None, &fixtures::cart(2000))
            .await;

        assert_eq!(status, QuoteStatus::NotRequired);
        assert_eq!(backend.calls("fetch_service_quote"), 0);
    }

    #[tokio::test]
    async fn test_ready_quote() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_quote_amount(500);

        let status = service(&backend, 5)
            .refresh(
                &fixtures::store_location(),
                Some(&fixtures::place()),
                &fixtures::cart(2000),
            )
            .await;

        assert_eq!(status.quote().unwrap().amount, Money::from_minor(500));
    }

    #[tokio::test]
    async fn test_failure_sets_error_flag() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_next("fetch_service_quote");

        let status = service(&backend, 5)
            .refresh(
                &fixtures::store_location(),
                Some(&fixtures::place()),
                &fixtures::cart(2000),
            )
            .await;

        assert!(status.error().unwrap().contains("Storefront request failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_quote_times_out() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_delay(Duration::from_secs(30));

        let status = service(&backend, 10)
            .refresh(
                &fixtures::store_location(),
                Some(&fixtures::place()),
                &fixtures::cart(2000),
            )
            .await;

        assert_eq!(
            status.error(),
            Some("service quote timed out after 10 seconds")
        );
    }

    #[tokio::test]
    async fn test_place_without_location_fails() {
        let backend = Arc::new(FakeBackend::new());
        let status = service(&backend, 5)
            .refresh(
                &fixtures::store_location(),
                Some(&Place::default()),
                &fixtures::cart(2000),
            )
            .await;

        assert!(matches!(status, QuoteStatus::Failed(_)));
        assert_eq!(backend.calls("fetch_service_quote"), 0);
    }

    #[test]
    fn test_nearest_store() {
        let locations = vec![
            StoreLocation {
                id: "far".into(),
                name: "Airport".into(),
                location: Coordinates::new(47.84, 106.77),
            },
            StoreLocation {
                id: "near".into(),
                name: "Central".into(),
                location: Coordinates::new(47.918, 106.917),
            },
        ];

        let nearest = QuoteService::nearest(&locations, &Coordinates::new(47.92, 106.92)).unwrap();
        assert_eq!(nearest.id, "near");
        assert!(QuoteService::nearest(&[], &Coordinates::new(0.0, 0.0)).is_none());
    }
}
