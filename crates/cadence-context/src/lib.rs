//! # cadence-context
//!
//! Sole read path for event context.
//!
//! - **[`assembler`]**: [`ContextAssembler`], cache-aside bundle assembly
//!   with a per-request query timeout
//! - **[`query`]**: the [`ViewQuery`] seam and its `SQLite` implementation
//! - **[`format`]**: deterministic prompt text for AI consumers
//! - **[`metrics`]**: cache hit/miss and query-error metric names

#![deny(unsafe_code)]

pub mod assembler;
pub mod errors;
pub mod format;
pub mod metrics;
pub mod query;

pub use assembler::{AssemblerConfig, ContextAssembler};
pub use errors::{ContextError, Result};
pub use format::format_for_ai;
pub use query::{SqliteViewQuery, ViewQuery};
