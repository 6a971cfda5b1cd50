use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use super::{InputType, OutputType};
use crate::tmux::{Layout, ModeState, Session};

/// Separates the pane id from the output bytes in a pane-output frame
pub const PANE_OUTPUT_SEPARATOR: u8 = b':';

/// Decimal without sign or leading zeros, so decoded numbers re-encode byte-for-byte
static RE_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:0|[1-9][0-9]*)$").unwrap());

static RE_GEOMETRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|[1-9][0-9]*),(0|[1-9][0-9]*)$").unwrap());

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("invalid payload for message type '{tag}': {reason}")]
    InvalidPayload { tag: char, reason: String },

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

fn invalid(tag: char, reason: impl Into<String>) -> FrameError {
    FrameError::InvalidPayload {
        tag,
        reason: reason.into(),
    }
}

fn text(payload: &[u8]) -> Result<String, FrameError> {
    Ok(std::str::from_utf8(payload)?.to_string())
}

/// Payload naming a pane, window or session; must not be empty
fn target(tag: char, payload: &[u8]) -> Result<String, FrameError> {
    let target = text(payload)?;
    if target.is_empty() {
        return Err(invalid(tag, "missing target"));
    }
    Ok(target)
}

fn count(tag: char, payload: &[u8]) -> Result<u32, FrameError> {
    let digits = std::str::from_utf8(payload)?;
    if !RE_COUNT.is_match(digits) {
        return Err(invalid(tag, format!("expected a line count, got {digits:?}")));
    }
    digits
        .parse()
        .map_err(|e| invalid(tag, format!("line count {digits}: {e}")))
}

/// A decoded client to server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Unrecognised tag, kept so it can be logged or re-encoded
    Unknown { tag: u8, payload: Vec<u8> },
    /// Keystrokes for the terminal
    Input(Vec<u8>),
    Ping(Vec<u8>),
    Resize { columns: u16, rows: u16 },
    SetEncoding(String),
    SelectPane(String),
    SelectWindow(String),
    SplitPane { horizontal: bool },
    ClosePane(String),
    CopyMode { enter: bool },
    SendCommand(String),
    ScrollUp(u32),
    ScrollDown(u32),
    NewWindow,
    SwitchSession(String),
}

impl ClientMessage {
    pub fn input_type(&self) -> InputType {
        match self {
            Self::Unknown { .. } => InputType::UnknownInput,
            Self::Input(_) => InputType::Input,
            Self::Ping(_) => InputType::Ping,
            Self::Resize { .. } => InputType::ResizeTerminal,
            Self::SetEncoding(_) => InputType::SetEncoding,
            Self::SelectPane(_) => InputType::TmuxSelectPane,
            Self::SelectWindow(_) => InputType::TmuxSelectWindow,
            Self::SplitPane { .. } => InputType::TmuxSplitPane,
            Self::ClosePane(_) => InputType::TmuxClosePane,
            Self::CopyMode { .. } => InputType::TmuxCopyMode,
            Self::SendCommand(_) => InputType::TmuxSendCommand,
            Self::ScrollUp(_) => InputType::TmuxScrollUp,
            Self::ScrollDown(_) => InputType::TmuxScrollDown,
            Self::NewWindow => InputType::TmuxNewWindow,
            Self::SwitchSession(_) => InputType::TmuxSwitchSession,
        }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let (&tag, payload) = frame.split_first().ok_or(FrameError::Empty)?;
        let kind = InputType::from_byte(tag);
        let tag_char = char::from(tag);

        let message = match kind {
            InputType::UnknownInput => Self::Unknown {
                tag,
                payload: payload.to_vec(),
            },
            InputType::Input => Self::Input(payload.to_vec()),
            InputType::Ping => Self::Ping(payload.to_vec()),
            InputType::ResizeTerminal => {
                let geometry = std::str::from_utf8(payload)?;
                let caps = RE_GEOMETRY
                    .captures(geometry)
                    .ok_or_else(|| invalid(tag_char, format!("expected <cols>,<rows>, got {geometry:?}")))?;
                let columns = caps[1]
                    .parse()
                    .map_err(|e| invalid(tag_char, format!("columns: {e}")))?;
                let rows = caps[2]
                    .parse()
                    .map_err(|e| invalid(tag_char, format!("rows: {e}")))?;
                Self::Resize { columns, rows }
            }
            InputType::SetEncoding => Self::SetEncoding(text(payload)?),
            InputType::TmuxSelectPane => Self::SelectPane(target(tag_char, payload)?),
            InputType::TmuxSelectWindow => Self::SelectWindow(target(tag_char, payload)?),
            InputType::TmuxSplitPane => match payload {
                b"h" => Self::SplitPane { horizontal: true },
                b"v" => Self::SplitPane { horizontal: false },
                _ => return Err(invalid(tag_char, "expected \"h\" or \"v\"")),
            },
            InputType::TmuxClosePane => Self::ClosePane(target(tag_char, payload)?),
            InputType::TmuxCopyMode => match payload {
                b"1" => Self::CopyMode { enter: true },
                b"0" => Self::CopyMode { enter: false },
                _ => return Err(invalid(tag_char, "expected \"1\" or \"0\"")),
            },
            InputType::TmuxSendCommand => Self::SendCommand(text(payload)?),
            InputType::TmuxScrollUp => Self::ScrollUp(count(tag_char, payload)?),
            InputType::TmuxScrollDown => Self::ScrollDown(count(tag_char, payload)?),
            InputType::TmuxNewWindow => Self::NewWindow,
            InputType::TmuxSwitchSession => Self::SwitchSession(target(tag_char, payload)?),
        };

        Ok(message)
    }

    pub fn encode(&self) -> Vec<u8> {
        let tag = match self {
            Self::Unknown { tag, .. } => *tag,
            other => other.input_type().as_byte(),
        };

        let payload: Vec<u8> = match self {
            Self::Unknown { payload, .. } | Self::Input(payload) | Self::Ping(payload) => {
                payload.clone()
            }
            Self::Resize { columns, rows } => format!("{columns},{rows}").into_bytes(),
            Self::SetEncoding(s)
            | Self::SelectPane(s)
            | Self::SelectWindow(s)
            | Self::ClosePane(s)
            | Self::SendCommand(s)
            | Self::SwitchSession(s) => s.clone().into_bytes(),
            Self::SplitPane { horizontal } => {
                if *horizontal { b"h".to_vec() } else { b"v".to_vec() }
            }
            Self::CopyMode { enter } => {
                if *enter { b"1".to_vec() } else { b"0".to_vec() }
            }
            Self::ScrollUp(n) | Self::ScrollDown(n) => n.to_string().into_bytes(),
            Self::NewWindow => Vec::new(),
        };

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(tag);
        frame.extend(payload);
        frame
    }
}

/// A server to client frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Unknown(Vec<u8>),
    /// Raw terminal output
    Output(Vec<u8>),
    Pong,
    SetWindowTitle(String),
    /// Opaque preferences blob, passed through untouched
    SetPreferences(Vec<u8>),
    Reconnect,
    SetBufferSize(usize),
    LayoutUpdate(Arc<Layout>),
    PaneOutput { pane_id: String, data: Vec<u8> },
    ModeUpdate(ModeState),
    SessionInfo(Vec<Session>),
    Error(String),
}

impl ServerMessage {
    pub fn output_type(&self) -> OutputType {
        match self {
            Self::Unknown(_) => OutputType::UnknownOutput,
            Self::Output(_) => OutputType::Output,
            Self::Pong => OutputType::Pong,
            Self::SetWindowTitle(_) => OutputType::SetWindowTitle,
            Self::SetPreferences(_) => OutputType::SetPreferences,
            Self::Reconnect => OutputType::SetReconnect,
            Self::SetBufferSize(_) => OutputType::SetBufferSize,
            Self::LayoutUpdate(_) => OutputType::TmuxLayoutUpdate,
            Self::PaneOutput { .. } => OutputType::TmuxPaneOutput,
            Self::ModeUpdate(_) => OutputType::TmuxModeUpdate,
            Self::SessionInfo(_) => OutputType::TmuxSessionInfo,
            Self::Error(_) => OutputType::TmuxError,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let payload = match self {
            Self::Unknown(data) | Self::Output(data) | Self::SetPreferences(data) => data.clone(),
            Self::Pong | Self::Reconnect => Vec::new(),
            Self::SetWindowTitle(s) | Self::Error(s) => s.clone().into_bytes(),
            Self::SetBufferSize(size) => size.to_string().into_bytes(),
            Self::LayoutUpdate(layout) => serde_json::to_vec(layout.as_ref())?,
            Self::PaneOutput { pane_id, data } => {
                let mut out = Vec::with_capacity(pane_id.len() + 1 + data.len());
                out.extend_from_slice(pane_id.as_bytes());
                out.push(PANE_OUTPUT_SEPARATOR);
                out.extend_from_slice(data);
                out
            }
            Self::ModeUpdate(state) => serde_json::to_vec(state)?,
            Self::SessionInfo(sessions) => serde_json::to_vec(sessions)?,
        };

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(self.output_type().as_byte());
        frame.extend(payload);
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let (&tag, payload) = frame.split_first().ok_or(FrameError::Empty)?;
        let tag_char = char::from(tag);

        let message = match OutputType::from_byte(tag) {
            OutputType::UnknownOutput => Self::Unknown(payload.to_vec()),
            OutputType::Output => Self::Output(payload.to_vec()),
            OutputType::Pong => Self::Pong,
            OutputType::SetWindowTitle => Self::SetWindowTitle(text(payload)?),
            OutputType::SetPreferences => Self::SetPreferences(payload.to_vec()),
            OutputType::SetReconnect => Self::Reconnect,
            OutputType::SetBufferSize => {
                let size = std::str::from_utf8(payload)?;
                if !RE_COUNT.is_match(size) {
                    return Err(invalid(tag_char, format!("expected a byte count, got {size:?}")));
                }
                Self::SetBufferSize(
                    size.parse()
                        .map_err(|e| invalid(tag_char, format!("byte count {size}: {e}")))?,
                )
            }
            OutputType::TmuxLayoutUpdate => {
                Self::LayoutUpdate(Arc::new(serde_json::from_slice(payload)?))
            }
            OutputType::TmuxPaneOutput => {
                let split = payload
                    .iter()
                    .position(|&b| b == PANE_OUTPUT_SEPARATOR)
                    .ok_or_else(|| invalid(tag_char, "missing pane id separator"))?;
                Self::PaneOutput {
                    pane_id: text(&payload[..split])?,
                    data: payload[split + 1..].to_vec(),
                }
            }
            OutputType::TmuxModeUpdate => Self::ModeUpdate(serde_json::from_slice(payload)?),
            OutputType::TmuxSessionInfo => Self::SessionInfo(serde_json::from_slice(payload)?),
            OutputType::TmuxError => Self::Error(text(payload)?),
        };

        Ok(message)
    }
}
