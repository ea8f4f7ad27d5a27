//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`,
//! so every operation is a function from (connection, input) to output.

pub mod notification;
pub mod schedule;
pub mod view;

pub use notification::NotificationRepo;
pub use schedule::{NewSession, ScheduleRepo};
pub use view::ViewRepo;

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    use crate::migrations::run_migrations;

    pub(crate) fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }
}
