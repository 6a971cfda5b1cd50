//! Line-oriented bridge: reads one client frame per stdin line and writes one
//! server frame per stdout line. Logs go to stderr.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tmux_webtty::actions::Action;
use tmux_webtty::bridge::{encode_line, spawn_frame_reader};
use tmux_webtty::webtty::{ServerMessage, PROTOCOLS};
use tmux_webtty::{spawn_layout_poller, Bridge, Config, Controller, Handled};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = Config::load()?;
    if let Some(session) = std::env::args().nth(1) {
        config.session_name = session;
    }

    let controller = Arc::new(Controller::from_config(&config));
    controller
        .start()
        .await
        .with_context(|| format!("Failed to start tmux session {}", config.session_name))?;
    info!(session = %config.session_name, protocol = PROTOCOLS[0], "bridge ready");

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    // Spawn input handler
    spawn_frame_reader(tokio::io::stdin(), tx.clone());

    // Spawn tmux poller
    if let Some(ms) = config.poll_interval_ms.filter(|ms| *ms > 0) {
        spawn_layout_poller(controller.clone(), Duration::from_millis(ms), tx.clone());
    }
    drop(tx);

    let bridge = Bridge::new(controller.clone());
    let mut stdout = tokio::io::stdout();
    for message in bridge.initial_messages() {
        write_frame(&mut stdout, &message).await?;
    }

    // Main event loop
    let result = loop {
        tokio::select! {
            action = rx.recv() => {
                let Some(action) = action else {
                    break Ok(());
                };
                match handle_action(&bridge, action, &mut stdout).await {
                    Ok(should_quit) => {
                        if should_quit {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        break Err(e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    controller.stop();
    result
}

/// Handle an action and return whether to quit
async fn handle_action(bridge: &Bridge, action: Action, stdout: &mut Stdout) -> Result<bool> {
    match action {
        Action::Frame(frame) => match bridge.handle_frame(&frame).await {
            Handled::Reply(replies) => {
                for reply in &replies {
                    write_frame(stdout, reply).await?;
                }
            }
            Handled::Terminal(message) => {
                debug!(kind = ?message.input_type(), "no terminal attached, dropping frame");
            }
        },
        Action::LayoutChanged(layout) => {
            write_frame(stdout, &ServerMessage::LayoutUpdate(layout)).await?;
        }
        Action::Error(msg) => {
            warn!(%msg, "bridge error");
            write_frame(stdout, &ServerMessage::Error(msg)).await?;
        }
        Action::Quit => return Ok(true),
    }
    Ok(false)
}

async fn write_frame(stdout: &mut Stdout, message: &ServerMessage) -> Result<()> {
    let frame = encode_line(message).context("Failed to encode frame")?;
    stdout.write_all(&frame).await.context("Failed to write frame")?;
    stdout.flush().await?;
    Ok(())
}
