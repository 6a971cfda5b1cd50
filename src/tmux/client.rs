use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::TmuxError;

/// Something that can run a tmux command line and hand back its stdout.
///
/// The controller only talks to tmux through this trait, so tests can swap in
/// a canned multiplexer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `tmux <args>`; a non-zero exit is an error
    async fn run(&self, args: &[&str]) -> Result<String, TmuxError>;
}

/// Client for interacting with tmux via CLI
#[derive(Debug, Clone)]
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
    /// Per-command deadline; `None` waits forever
    timeout: Option<Duration>,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
            timeout: None,
        }
    }

    pub fn with_path(mut self, tmux_path: impl Into<String>) -> Self {
        self.tmux_path = tmux_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for TmuxClient {
    async fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let command = args.join(" ");
        debug!(tmux = %self.tmux_path, %command, "running tmux");

        // The child is killed if the future is dropped, so a timeout leaves nothing behind.
        let child = Command::new(&self.tmux_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child).await {
                Ok(result) => result,
                Err(_) => return Err(TmuxError::Timeout { command, timeout }),
            },
            None => child.await,
        }
        .map_err(|source| TmuxError::Spawn {
            command: command.clone(),
            source,
        })?;

        if !output.status.success() {
            // One line, so the message fits in a single outbound frame
            let stderr = String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TmuxError::Subprocess {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
