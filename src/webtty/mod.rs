//! Message tags shared with the browser client.
//!
//! Every frame starts with a one-byte tag; the rest is the payload. Inbound
//! (client to server) and outbound (server to client) tags live in separate
//! spaces, so the same byte means different things in each direction.

mod message;

pub use message::{ClientMessage, FrameError, ServerMessage, PANE_OUTPUT_SEPARATOR};

/// Sub-protocol names advertised on the streaming handshake
pub const PROTOCOLS: &[&str] = &["webtty"];

/// Tags of client to server frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputType {
    /// Unknown message type, maybe sent by a bug
    UnknownInput = b'0',
    /// User input typically from a keyboard
    Input = b'1',
    Ping = b'2',
    /// The browser size has changed
    ResizeTerminal = b'3',
    SetEncoding = b'4',
    TmuxSelectPane = b'5',
    TmuxSelectWindow = b'6',
    /// Split the active pane (payload `h` or `v`)
    TmuxSplitPane = b'7',
    TmuxClosePane = b'8',
    /// Enter or leave copy mode (payload `1` or `0`)
    TmuxCopyMode = b'9',
    /// Raw tmux command line
    TmuxSendCommand = b'A',
    TmuxScrollUp = b'B',
    TmuxScrollDown = b'C',
    TmuxNewWindow = b'D',
    TmuxSwitchSession = b'E',
}

impl InputType {
    /// Map a tag byte; anything unrecognised is `UnknownInput`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'1' => Self::Input,
            b'2' => Self::Ping,
            b'3' => Self::ResizeTerminal,
            b'4' => Self::SetEncoding,
            b'5' => Self::TmuxSelectPane,
            b'6' => Self::TmuxSelectWindow,
            b'7' => Self::TmuxSplitPane,
            b'8' => Self::TmuxClosePane,
            b'9' => Self::TmuxCopyMode,
            b'A' => Self::TmuxSendCommand,
            b'B' => Self::TmuxScrollUp,
            b'C' => Self::TmuxScrollDown,
            b'D' => Self::TmuxNewWindow,
            b'E' => Self::TmuxSwitchSession,
            _ => Self::UnknownInput,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_char(self) -> char {
        char::from(self.as_byte())
    }

    /// Whether the frame is a tmux operation rather than raw terminal traffic
    pub fn is_tmux(self) -> bool {
        self.as_byte() >= b'5'
    }
}

/// Tags of server to client frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputType {
    /// Unknown message type, maybe set by a bug
    UnknownOutput = b'0',
    /// Normal output to the terminal
    Output = b'1',
    Pong = b'2',
    SetWindowTitle = b'3',
    SetPreferences = b'4',
    /// Make the terminal reconnect
    SetReconnect = b'5',
    SetBufferSize = b'6',
    /// JSON layout of the bound session
    TmuxLayoutUpdate = b'7',
    TmuxPaneOutput = b'8',
    /// JSON copy-mode state
    TmuxModeUpdate = b'9',
    /// JSON session list
    TmuxSessionInfo = b'A',
    TmuxError = b'B',
}

impl OutputType {
    /// Map a tag byte; anything unrecognised is `UnknownOutput`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'1' => Self::Output,
            b'2' => Self::Pong,
            b'3' => Self::SetWindowTitle,
            b'4' => Self::SetPreferences,
            b'5' => Self::SetReconnect,
            b'6' => Self::SetBufferSize,
            b'7' => Self::TmuxLayoutUpdate,
            b'8' => Self::TmuxPaneOutput,
            b'9' => Self::TmuxModeUpdate,
            b'A' => Self::TmuxSessionInfo,
            b'B' => Self::TmuxError,
            _ => Self::UnknownOutput,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_char(self) -> char {
        char::from(self.as_byte())
    }
}
