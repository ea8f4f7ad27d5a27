//! Refresher lifecycle states.

use std::fmt;

use serde::Serialize;

/// Where the refresher is in its lifecycle.
///
/// `Uninitialized -> Listening <-> Debouncing`, `Listening -> Reconnecting
/// -> Listening` on a lost subscription, and any state `-> ShutDown`, which
/// is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefresherState {
    /// Constructed, not yet subscribed.
    Uninitialized,
    /// Subscribed, no rebuild pending.
    Listening,
    /// Subscribed, debounce timer armed.
    Debouncing,
    /// Subscription lost, waiting to resubscribe.
    Reconnecting,
    /// Stopped for good.
    ShutDown,
}

impl RefresherState {
    /// Whether the subscription is up in this state.
    pub fn is_listening(self) -> bool {
        matches!(self, Self::Listening | Self::Debouncing)
    }
}

impl fmt::Display for RefresherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Listening => "listening",
            Self::Debouncing => "debouncing",
            Self::Reconnecting => "reconnecting",
            Self::ShutDown => "shut_down",
        };
        f.write_str(name)
    }
}
