//! # cadence-cache
//!
//! Time-boxed cache layer in front of the relevance views.
//!
//! - **[`CacheStore`]**: async byte store with per-entry TTL
//! - **[`MemoryCache`]**: in-process implementation with an availability
//!   switch for outage testing
//! - **[`TypedCache`]**: JSON encode/decode, fail-soft reads and writes,
//!   hit/miss counters
//! - **[`CacheKey`]**: the `contractor-bundle:<id>` and `event-context:<id>`
//!   key shapes

#![deny(unsafe_code)]

pub mod errors;
pub mod keys;
pub mod memory;
pub mod store;
pub mod typed;

pub use errors::{CacheError, Result};
pub use keys::CacheKey;
pub use memory::MemoryCache;
pub use store::CacheStore;
pub use typed::{CacheStats, TypedCache};
