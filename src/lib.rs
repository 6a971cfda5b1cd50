//! tmux control core for a browser-facing terminal bridge.
//!
//! - [`tmux`] keeps a named tmux session alive, caches its layout and runs
//!   pane/window/session operations against it
//! - [`webtty`] defines the one-byte tags and payloads of the frames exchanged
//!   with the browser client
//! - [`bridge`] turns decoded client frames into controller calls and
//!   outbound frames

pub mod actions;
pub mod bridge;
pub mod config;
pub mod tmux;
pub mod webtty;

pub use bridge::{spawn_layout_poller, Bridge, Handled};
pub use config::Config;
pub use tmux::{Controller, Layout, TmuxError};
