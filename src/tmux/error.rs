use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the tmux controller
#[derive(Debug, Error)]
pub enum TmuxError {
    /// The tmux binary could not be spawned
    #[error("failed to execute tmux {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// tmux ran but exited non-zero
    #[error("tmux {command} failed ({status}): {stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("tmux {command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Output did not have the expected shape
    #[error("invalid tmux output: {0:?}")]
    Parse(String),

    #[error("invalid tmux command: {0}")]
    InvalidArgument(String),

    #[error("failed to create tmux session {name}: {source}")]
    SessionCreationFailed {
        name: String,
        #[source]
        source: Box<TmuxError>,
    },

    #[error("failed to refresh layout: {source}")]
    RefreshFailed {
        #[source]
        source: Box<TmuxError>,
    },
}

impl TmuxError {
    pub(crate) fn refresh_failed(source: TmuxError) -> Self {
        Self::RefreshFailed {
            source: Box::new(source),
        }
    }

    /// Whether the error came from running the tmux binary itself
    pub fn is_subprocess(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::Subprocess { .. } | Self::Timeout { .. }
        )
    }
}
