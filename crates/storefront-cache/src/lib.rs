//! # storefront-cache: Local Cache for the Storefront
//!
//! Keeps the client's copies of the cart, customer, delivery place and
//! store location across app restarts, in a small SQLite key-value table.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront Data Flow                              │
//! │                                                                         │
//! │  CartService::add_line / CheckoutOrchestrator::place_order              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-cache (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │  CacheStore   │    │ Repositories  │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ KvRepository  │    │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │    │ SlotRepository│    │ 001_kv.sql   │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file under the platform data directory                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_cache::{CacheConfig, CacheStore};
//!
//! let store = CacheStore::new(CacheConfig::new("storefront.db")).await?;
//! store.slots().save_cart(&cart).await?;
//! let cart = store.slots().cart().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CacheError, CacheResult};
pub use pool::{CacheConfig, CacheStore};

pub use repository::kv::{KvEntry, KvRepository};
pub use repository::slots::{order_notes_key, Slot, SlotRepository};
