//! # Typed Slots
//!
//! The well-known keys the storefront keeps between launches.
//!
//! ## Slots
//! ```text
//! ┌────────────────┬──────────────────┬─────────────────────────────────────┐
//! │ slot           │ type             │ written by                          │
//! ├────────────────┼──────────────────┼─────────────────────────────────────┤
//! │ cart           │ Cart             │ cart service after every mutation   │
//! │ customer       │ Customer         │ sign-in / profile update            │
//! │ deliver_to     │ Place            │ location picker                     │
//! │ store_location │ StoreLocation    │ nearest-store selection             │
//! └────────────────┴──────────────────┴─────────────────────────────────────┘
//! ```
//!
//! The cached values are advisory: the backend is the source of truth. A
//! slot whose JSON no longer parses is dropped with a warning and reads as
//! empty.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use storefront_core::{Cart, Customer, Place, StoreLocation};

use crate::error::{CacheError, CacheResult};
use crate::repository::kv::KvRepository;

/// A well-known cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Cart,
    Customer,
    DeliverTo,
    StoreLocation,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Cart, Slot::Customer, Slot::DeliverTo, Slot::StoreLocation];

    pub fn key(&self) -> &'static str {
        match self {
            Slot::Cart => "cart",
            Slot::Customer => "customer",
            Slot::DeliverTo => "deliver_to",
            Slot::StoreLocation => "store_location",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Key holding a customer's draft order notes.
pub fn order_notes_key(customer_id: Option<&str>) -> String {
    format!("{}_order_notes", customer_id.unwrap_or("anon"))
}

/// Typed access to the storefront slots.
#[derive(Debug, Clone)]
pub struct SlotRepository {
    kv: KvRepository,
}

impl SlotRepository {
    pub fn new(kv: KvRepository) -> Self {
        SlotRepository { kv }
    }

    /// Reads a slot, dropping it if the stored JSON is stale.
    pub async fn load<T: DeserializeOwned>(&self, slot: Slot) -> CacheResult<Option<T>> {
        match self.kv.get_json::<T>(slot.key()).await {
            Ok(value) => Ok(value),
            Err(CacheError::Serialization(reason)) => {
                warn!(slot = %slot, reason = %reason, "Discarding unreadable cache slot");
                self.kv.remove(slot.key()).await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn save<T: Serialize>(&self, slot: Slot, value: &T) -> CacheResult<()> {
        self.kv.set_json(slot.key(), value).await
    }

    pub async fn clear(&self, slot: Slot) -> CacheResult<bool> {
        self.kv.remove(slot.key()).await
    }

    pub async fn cart(&self) -> CacheResult<Option<Cart>> {
        self.load(Slot::Cart).await
    }

    pub async fn save_cart(&self, cart: &Cart) -> CacheResult<()> {
        self.save(Slot::Cart, cart).await
    }

    pub async fn customer(&self) -> CacheResult<Option<Customer>> {
        self.load(Slot::Customer).await
    }

    pub async fn save_customer(&self, customer: &Customer) -> CacheResult<()> {
        self.save(Slot::Customer, customer).await
    }

    pub async fn deliver_to(&self) -> CacheResult<Option<Place>> {
        self.load(Slot::DeliverTo).await
    }

    pub async fn save_deliver_to(&self, place: &Place) -> CacheResult<()> {
        self.save(Slot::DeliverTo, place).await
    }

    pub async fn store_location(&self) -> CacheResult<Option<StoreLocation>> {
        self.load(Slot::StoreLocation).await
    }

    pub async fn save_store_location(&self, location: &StoreLocation) -> CacheResult<()> {
        self.save(Slot::StoreLocation, location).await
    }

    pub async fn order_notes(&self, customer_id: Option<&str>) -> CacheResult<String> {
        let notes: Option<String> = self.kv.get_json(&order_notes_key(customer_id)).await?;
        Ok(notes.unwrap_or_default())
    }

    pub async fn save_order_notes(&self, customer_id: Option<&str>, notes: &str) -> CacheResult<()> {
        self.kv.set_json(&order_notes_key(customer_id), notes).await
    }

    /// Drops customer-bound slots on sign-out. The store location stays.
    pub async fn sign_out(&self) -> CacheResult<()> {
        for slot in [Slot::Cart, Slot::Customer, Slot::DeliverTo] {
            self.clear(slot).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
