//! Configuration for the bridge.
//!
//! Read from `config.toml` in the platform config directory when present,
//! then overridden by `TMUX_WEBTTY_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::tmux::Delimiter;

pub const ENV_SESSION: &str = "TMUX_WEBTTY_SESSION";
pub const ENV_TMUX: &str = "TMUX_WEBTTY_TMUX";
pub const ENV_TIMEOUT_MS: &str = "TMUX_WEBTTY_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// tmux binary, looked up on PATH unless absolute
    pub tmux_path: String,
    /// Session to attach to, created if missing
    pub session_name: String,
    /// Per-command deadline for tmux; unset means wait forever
    pub command_timeout_ms: Option<u64>,
    /// Field separator used in tmux format strings
    pub field_delimiter: Delimiter,
    /// How often to poll tmux for layout changes; unset disables polling
    pub poll_interval_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
            session_name: "webtty".to_string(),
            command_timeout_ms: None,
            field_delimiter: Delimiter::Comma,
            poll_interval_ms: None,
        }
    }
}

impl Config {
    /// Load from the default location and the process environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply overrides from `lookup` (normally the environment)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(session) = lookup(ENV_SESSION).filter(|s| !s.is_empty()) {
            self.session_name = session;
        }
        if let Some(tmux) = lookup(ENV_TMUX).filter(|s| !s.is_empty()) {
            self.tmux_path = tmux;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            let ms: u64 = timeout
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_MS} is not a number: {timeout:?}"))?;
            self.command_timeout_ms = (ms > 0).then_some(ms);
        }
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tmux-webtty").join("config.toml"))
    }
}
