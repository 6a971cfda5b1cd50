//! Glue between decoded client frames and the tmux controller.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::actions::Action;
use crate::tmux::{Controller, Layout, TmuxError};
use crate::webtty::{ClientMessage, FrameError, ServerMessage};

/// What the bridge did with a client frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// Frames to send back to the client, possibly none
    Reply(Vec<ServerMessage>),
    /// Terminal traffic (input, resize, encoding) for the PTY host
    Terminal(ClientMessage),
}

/// Routes client frames to a shared [`Controller`]
pub struct Bridge {
    controller: Arc<Controller>,
}

impl Bridge {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Frames a client should receive right after connecting
    pub fn initial_messages(&self) -> Vec<ServerMessage> {
        match self.controller.get_layout() {
            Some(layout) => vec![
                ServerMessage::SessionInfo(layout.sessions.clone()),
                ServerMessage::LayoutUpdate(layout),
            ],
            None => Vec::new(),
        }
    }

    /// Decode and handle a raw frame; undecodable frames are answered with an error frame
    pub async fn handle_frame(&self, frame: &[u8]) -> Handled {
        match ClientMessage::decode(frame) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                warn!(error = %e, "dropping bad client frame");
                Handled::Reply(vec![ServerMessage::Error(e.to_string())])
            }
        }
    }

    pub async fn handle(&self, message: ClientMessage) -> Handled {
        let controller = &self.controller;

        let replies = match message {
            ClientMessage::Input(_)
            | ClientMessage::Resize { .. }
            | ClientMessage::SetEncoding(_) => return Handled::Terminal(message),
            ClientMessage::Unknown { tag, .. } => {
                debug!(tag = %char::from(tag), "ignoring unknown message type");
                Vec::new()
            }
            ClientMessage::Ping(_) => vec![ServerMessage::Pong],
            ClientMessage::SelectPane(id) => self.layout_reply(controller.select_pane(&id).await),
            ClientMessage::SelectWindow(id) => {
                self.layout_reply(controller.select_window(&id).await)
            }
            ClientMessage::SplitPane { horizontal } => {
                self.layout_reply(controller.split_pane(horizontal).await)
            }
            ClientMessage::ClosePane(id) => self.layout_reply(controller.close_pane(&id).await),
            ClientMessage::NewWindow => self.layout_reply(controller.new_window().await),
            ClientMessage::SendCommand(command) => {
                let result = controller.send_command(&command).await.map(|out| {
                    debug!(%command, output = %out.trim_end(), "raw tmux command finished");
                });
                self.layout_reply(result)
            }
            ClientMessage::SwitchSession(name) => {
                let mut replies = self.layout_reply(controller.switch_session(&name).await);
                if let Some(layout) = controller.get_layout() {
                    replies.push(ServerMessage::SessionInfo(layout.sessions.clone()));
                }
                replies
            }
            ClientMessage::CopyMode { enter } => {
                let result = if enter {
                    controller.enter_copy_mode().await
                } else {
                    controller.exit_copy_mode().await
                };
                self.mode_reply(result).await
            }
            ClientMessage::ScrollUp(lines) => self.mode_reply(controller.scroll_up(lines).await).await,
            ClientMessage::ScrollDown(lines) => {
                self.mode_reply(controller.scroll_down(lines).await).await
            }
        };

        Handled::Reply(replies)
    }

    /// Current layout after a mutation, or the error that stopped it
    fn layout_reply(&self, result: Result<(), TmuxError>) -> Vec<ServerMessage> {
        match result {
            Ok(()) => self
                .controller
                .get_layout()
                .map(ServerMessage::LayoutUpdate)
                .into_iter()
                .collect(),
            Err(e) => vec![ServerMessage::Error(e.to_string())],
        }
    }

    /// Copy-mode state of the active pane after a copy-mode command
    async fn mode_reply(&self, result: Result<(), TmuxError>) -> Vec<ServerMessage> {
        if let Err(e) = result {
            return vec![ServerMessage::Error(e.to_string())];
        }
        match self.controller.mode_state(None).await {
            Ok(state) => vec![ServerMessage::ModeUpdate(state)],
            Err(e) => {
                warn!(error = %e, "failed to read copy-mode state");
                Vec::new()
            }
        }
    }
}

/// Read newline-terminated client frames from `reader` as raw bytes and
/// forward them as [`Action::Frame`]. Blank lines are skipped. Sends
/// [`Action::Quit`] at end of input or after a read error.
pub fn spawn_frame_reader<R>(reader: R, tx: mpsc::UnboundedSender<Action>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut frames = BufReader::new(reader).split(b'\n');
        loop {
            match frames.next_segment().await {
                Ok(Some(frame)) if frame.is_empty() => {}
                Ok(Some(frame)) => {
                    if tx.send(Action::Frame(frame)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send(Action::Quit);
                    break;
                }
                Err(e) => {
                    let _ = tx.send(Action::Error(format!("input: {}", e)));
                    let _ = tx.send(Action::Quit);
                    break;
                }
            }
        }
    })
}

/// Encode `message` as one newline-terminated line.
///
/// Line breaks inside text payloads (errors, titles) become spaces. Raw byte
/// payloads are written as-is, so terminal and pane output can't use this framing.
pub fn encode_line(message: &ServerMessage) -> Result<Vec<u8>, FrameError> {
    let single_line = |text: &str| text.replace(['\r', '\n'], " ");
    let mut line = match message {
        ServerMessage::Error(text) => ServerMessage::Error(single_line(text)).encode()?,
        ServerMessage::SetWindowTitle(text) => {
            ServerMessage::SetWindowTitle(single_line(text)).encode()?
        }
        other => other.encode()?,
    };
    line.push(b'\n');
    Ok(line)
}

/// Refresh the layout every `interval` and report changes as
/// [`Action::LayoutChanged`]. Runs until the controller stops or `tx` closes.
pub fn spawn_layout_poller(
    controller: Arc<Controller>,
    interval: Duration,
    tx: mpsc::UnboundedSender<Action>,
) -> JoinHandle<()> {
    let mut shutdown = controller.shutdown_signal();

    tokio::spawn(async move {
        let mut last: Option<Arc<Layout>> = controller.get_layout();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let action = match controller.refresh_layout().await {
                Ok(()) => match controller.get_layout() {
                    Some(layout) if last.as_deref() != Some(&*layout) => {
                        last = Some(layout.clone());
                        Action::LayoutChanged(layout)
                    }
                    _ => continue,
                },
                Err(e) => Action::Error(format!("Tmux: {}", e)),
            };

            if tx.send(action).is_err() {
                break;
            }
        }

        debug!("layout poller stopped");
    })
}
