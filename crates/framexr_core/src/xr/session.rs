//! Session and facade lifecycle states.

use std::fmt::{Display, Formatter};

/// `XrSessionState` as reported by the host's state-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl SessionState {
    /// Maps a raw `XrSessionState`; unrecognised values become `Unknown`.
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => Self::Idle,
            2 => Self::Ready,
            3 => Self::Synchronized,
            4 => Self::Visible,
            5 => Self::Focused,
            6 => Self::Stopping,
            7 => Self::LossPending,
            8 => Self::Exiting,
            _ => Self::Unknown,
        }
    }

    pub fn into_raw(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Idle => 1,
            Self::Ready => 2,
            Self::Synchronized => 3,
            Self::Visible => 4,
            Self::Focused => 5,
            Self::Stopping => 6,
            Self::LossPending => 7,
            Self::Exiting => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Synchronized => "synchronized",
            Self::Visible => "visible",
            Self::Focused => "focused",
            Self::Stopping => "stopping",
            Self::LossPending => "loss-pending",
            Self::Exiting => "exiting",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facade lifecycle: `Uninitialized -> InstanceBound -> SessionBound -> Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    InstanceBound,
    SessionBound,
    Initialized,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::InstanceBound => "instance_bound",
            Self::SessionBound => "session_bound",
            Self::Initialized => "initialized",
        }
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
