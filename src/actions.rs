use std::sync::Arc;

use crate::tmux::Layout;

/// Actions that can be dispatched through the bridge event loop
#[derive(Debug, Clone)]
pub enum Action {
    /// A raw frame arrived from the client
    Frame(Vec<u8>),
    /// The poller saw a layout different from the last one
    LayoutChanged(Arc<Layout>),
    /// An error occurred
    Error(String),
    /// Request to quit the application
    Quit,
}
