//! # cadence-core
//!
//! Foundation types shared by every Cadence crate.
//!
//! - **IDs**: `ContractorId`, `EventId`, `SessionId` as numeric newtypes
//! - **Schedule records**: [`session::Session`], the source-of-truth row
//! - **View rows and bundles**: [`context::SessionContext`],
//!   [`context::UpcomingSessionContext`], [`context::EventContext`]
//! - **Focus areas**: [`tags::FocusAreas`], a normalized tag set that accepts
//!   every storage shape the schedule tables have used
//! - **Scoring**: relevance, urgency and priority rules for view rebuilds
//! - **Clock**: injectable wall clock so time-dependent logic is testable
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod clock;
pub mod constants;
pub mod context;
pub mod ids;
pub mod logging;
pub mod scoring;
pub mod session;
pub mod tags;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ContextStats, EventContext, SessionContext, UpcomingSessionContext};
pub use ids::{ContractorId, EventId, SessionId};
pub use session::Session;
pub use tags::FocusAreas;
