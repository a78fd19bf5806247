//! # Repository Module
//!
//! ```text
//! CheckoutOrchestrator / CartService
//!      │
//!      │  store.slots().save_cart(&cart)
//!      ▼
//! SlotRepository    typed cart / customer / deliver_to / store_location
//!      │
//!      ▼
//! KvRepository      string key → JSON text
//!      │
//!      ▼
//! kv_cache table
//! ```
//!
//! - [`kv::KvRepository`] - Raw key-value operations
//! - [`slots::SlotRepository`] - Typed storefront slots

pub mod kv;
pub mod slots;
