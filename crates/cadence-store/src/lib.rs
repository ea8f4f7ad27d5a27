//! # cadence-store
//!
//! `SQLite` storage for the Cadence service.
//!
//! - **[`connection`]**: `r2d2` pool with WAL, foreign keys and busy timeout on
//!   every connection, plus dedicated connections for the listener
//! - **[`migrations`]**: embedded, version-tracked schema
//! - **[`row_types`]**: raw row structs and timestamp encoding
//! - **[`repositories`]**: stateless repositories over `&Connection`
//!
//! Schedule tables (`events`, `contractors`, `event_attendees`,
//! `event_sessions`) are the source of truth. `view_sessions_now` and
//! `view_sessions_next_60` are snapshot tables that only the view rebuild
//! writes. `change_notifications` is an outbox filled by triggers.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, PragmaState, new_file, new_in_memory,
    open_dedicated, verify_pragmas,
};
pub use errors::{Result, StoreError};
pub use migrations::{current_version, latest_version, run_migrations};
pub use repositories::{NewSession, NotificationRepo, ScheduleRepo, ViewRepo};
pub use row_types::NotificationRow;
