mod client;
mod controller;
mod error;
mod parse;
#[cfg(test)]
pub(crate) mod stub;

pub use client::{CommandRunner, TmuxClient};
pub use controller::{Controller, EVENT_CHANNEL_CAPACITY};
pub use error::TmuxError;
pub use parse::Delimiter;

use serde::{Deserialize, Serialize};

/// Represents a tmux session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (e.g., "$0")
    pub id: String,
    /// Session name
    pub name: String,
    /// Number of windows in the session
    pub windows: usize,
    /// Whether any client is attached
    pub attached: bool,
    /// Whether this is the session the controller is bound to
    pub active: bool,
}

/// Represents a tmux window and its panes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Window ID (e.g., "@1")
    pub id: String,
    pub name: String,
    pub index: u32,
    pub active: bool,
    /// Panes in the order tmux lists them
    pub panes: Vec<Pane>,
}

/// Represents a tmux pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    /// Pane ID (e.g., "%1")
    pub id: String,
    pub index: u32,
    pub active: bool,
    pub width: u32,
    pub height: u32,
    pub top: u32,
    pub left: u32,
    /// Command currently running in the pane
    pub command: String,
    pub title: String,
}

/// Structural snapshot of the bound session.
///
/// A published `Layout` is never mutated; refreshes build a new one and swap
/// it into the controller's cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub session_id: String,
    pub session_name: String,
    pub sessions: Vec<Session>,
    pub windows: Vec<Window>,
    /// Empty when the session has no active window
    pub active_window_id: String,
    /// Empty when the active window has no active pane
    pub active_pane_id: String,
}

impl Layout {
    /// The window flagged active, if any
    pub fn active_window(&self) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == self.active_window_id)
    }

    /// The active pane of the active window, if any
    pub fn active_pane(&self) -> Option<&Pane> {
        self.active_window()?
            .panes
            .iter()
            .find(|p| p.id == self.active_pane_id)
    }
}

/// Copy-mode state of a single pane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeState {
    pub pane_id: String,
    pub in_copy_mode: bool,
    /// Lines scrolled back from the bottom; never exceeds `history_size`
    pub scroll_position: u32,
    pub history_size: u32,
}

/// A control-mode notification delivered through the controller's event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Notification tag (e.g., "%layout-change")
    pub kind: String,
    /// Raw remainder of the notification line
    pub payload: String,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}
