//! Numeric ID newtypes.
//!
//! Schedule records are keyed by database integers. Wrapping them keeps a
//! contractor ID from being passed where an event ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database ID.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw database ID.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id! {
    /// Identifier of a contractor (the subscriber context is assembled for).
    ContractorId
}

numeric_id! {
    /// Identifier of an event.
    EventId
}

numeric_id! {
    /// Identifier of a scheduled session within an event.
    SessionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_number() {
        assert_eq!(ContractorId::new(42).to_string(), "42");
    }

    #[test]
    fn parses_with_whitespace() {
        let id: EventId = " 7 ".parse().unwrap();
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn rejects_non_numeric() {
        assert!("abc".parse::<SessionId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&SessionId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: SessionId = serde_json::from_str("9").unwrap();
        assert_eq!(back, SessionId::new(9));
    }
}
