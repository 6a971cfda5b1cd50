use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::parse::{
    self, Delimiter, MODE_FIELDS, PANE_FIELDS, SESSION_FIELDS, SESSION_IDENTITY_FIELDS,
    WINDOW_FIELDS,
};
use super::{CommandRunner, Event, Layout, ModeState, TmuxClient, TmuxError};
use crate::config::Config;

/// Capacity of the controller's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Drives one tmux session and caches its layout.
///
/// Layout reads never wait on tmux: a refresh builds the new [`Layout`]
/// first and only takes the write lock to swap it in. tmux invocations
/// themselves are not serialized, so callers that need ordering between
/// mutations must provide it.
pub struct Controller {
    runner: Arc<dyn CommandRunner>,
    delimiter: Delimiter,
    session_name: RwLock<String>,
    layout: RwLock<Option<Arc<Layout>>>,
    /// `None` once stopped, which closes every subscriber's stream
    events: Mutex<Option<broadcast::Sender<Event>>>,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Create a controller for `session_name` using the `tmux` on PATH
    pub fn new(session_name: impl Into<String>) -> Self {
        Self::with_runner(session_name, Arc::new(TmuxClient::new()))
    }

    pub fn with_runner(session_name: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Self {
            runner,
            delimiter: Delimiter::default(),
            session_name: RwLock::new(session_name.into()),
            layout: RwLock::new(None),
            events: Mutex::new(Some(events)),
            shutdown,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = TmuxClient::new()
            .with_path(&config.tmux_path)
            .with_timeout(config.command_timeout_ms.map(Duration::from_millis));
        Self::with_runner(&config.session_name, Arc::new(client)).with_delimiter(config.field_delimiter)
    }

    /// Use `delimiter` between fields of every tmux format string
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Name of the session currently bound
    pub fn session_name(&self) -> String {
        self.session_name.read().clone()
    }

    /// Ensure the session exists, creating it detached if needed, then load
    /// the initial layout.
    pub async fn start(&self) -> Result<(), TmuxError> {
        let name = self.session_name();

        if let Err(e) = self.runner.run(&["has-session", "-t", name.as_str()]).await {
            debug!(session = %name, error = %e, "session not found, creating it");
            self.runner
                .run(&["new-session", "-d", "-s", name.as_str()])
                .await
                .map_err(|source| TmuxError::SessionCreationFailed {
                    name: name.clone(),
                    source: Box::new(source),
                })?;
            info!(session = %name, "created tmux session");
        }

        self.refresh_layout().await
    }

    /// Signal shutdown and close the event channel. Calling it again is a no-op.
    pub fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        self.events.lock().take();
        debug!(session = %self.session_name(), "controller stopped");
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that flips to `true` when [`Controller::stop`] is called
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Subscribe to control-mode events.
    ///
    /// Subscribers see events sent after they subscribe, in order. A slow
    /// subscriber that falls more than [`EVENT_CHANNEL_CAPACITY`] events
    /// behind gets `RecvError::Lagged`. After `stop` the stream is closed.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        match self.events.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Producer handle for an event source; `None` once stopped
    pub fn event_sender(&self) -> Option<broadcast::Sender<Event>> {
        self.events.lock().clone()
    }

    /// Most recently published layout, `None` before the first refresh succeeds
    pub fn get_layout(&self) -> Option<Arc<Layout>> {
        self.layout.read().clone()
    }

    /// Rebuild the layout from tmux. On failure the cached layout is kept.
    pub async fn refresh_layout(&self) -> Result<(), TmuxError> {
        let layout = self
            .build_layout()
            .await
            .map_err(TmuxError::refresh_failed)?;

        *self.layout.write() = Some(Arc::new(layout));
        Ok(())
    }

    async fn build_layout(&self) -> Result<Layout, TmuxError> {
        let name = self.session_name();
        let delim = self.delimiter;

        let identity_format = delim.format(SESSION_IDENTITY_FIELDS);
        let identity = self
            .runner
            .run(&["display-message", "-t", name.as_str(), "-p", identity_format.as_str()])
            .await?;
        let (session_id, session_name) = parse::parse_session_identity(&identity, delim)?;

        let sessions_format = delim.format(SESSION_FIELDS);
        let sessions = match self
            .runner
            .run(&["list-sessions", "-F", sessions_format.as_str()])
            .await
        {
            Ok(out) => parse::parse_sessions(&out, delim, &name),
            Err(e) => {
                warn!(error = %e, "list-sessions failed, continuing without session list");
                Vec::new()
            }
        };

        let windows_format = delim.format(WINDOW_FIELDS);
        let windows_out = self
            .runner
            .run(&["list-windows", "-t", name.as_str(), "-F", windows_format.as_str()])
            .await?;

        let mut layout = Layout {
            session_id,
            session_name,
            sessions,
            ..Layout::default()
        };

        let panes_format = delim.format(PANE_FIELDS);
        for mut window in parse::parse_windows(&windows_out, delim) {
            // First active window wins; later ones are demoted
            if window.active {
                if layout.active_window_id.is_empty() {
                    layout.active_window_id = window.id.clone();
                } else {
                    window.active = false;
                }
            }

            match self
                .runner
                .run(&["list-panes", "-t", window.id.as_str(), "-F", panes_format.as_str()])
                .await
            {
                Ok(out) => {
                    let mut seen_active = false;
                    for mut pane in parse::parse_panes(&out, delim) {
                        if pane.active {
                            if seen_active {
                                pane.active = false;
                            } else {
                                seen_active = true;
                                if window.active {
                                    layout.active_pane_id = pane.id.clone();
                                }
                            }
                        }
                        window.panes.push(pane);
                    }
                }
                Err(e) => {
                    warn!(window = %window.id, error = %e, "list-panes failed, keeping window without panes");
                }
            }

            layout.windows.push(window);
        }

        Ok(layout)
    }

    /// Refresh after a successful mutation. The mutation already happened,
    /// so a failure here only leaves the cache stale.
    async fn refresh_after(&self, operation: &str) {
        if let Err(e) = self.refresh_layout().await {
            warn!(operation, error = %e, "refresh after tmux command failed, layout is stale");
        }
    }

    pub async fn select_pane(&self, pane_id: &str) -> Result<(), TmuxError> {
        self.runner.run(&["select-pane", "-t", pane_id]).await?;
        self.refresh_after("select-pane").await;
        Ok(())
    }

    pub async fn select_window(&self, window_id: &str) -> Result<(), TmuxError> {
        self.runner.run(&["select-window", "-t", window_id]).await?;
        self.refresh_after("select-window").await;
        Ok(())
    }

    /// Switch the attached client to `session_name` and rebind the controller to it.
    ///
    /// The binding sticks even if the follow-up refresh fails, since tmux has
    /// already switched.
    pub async fn switch_session(&self, session_name: &str) -> Result<(), TmuxError> {
        self.runner.run(&["switch-client", "-t", session_name]).await?;
        let previous = std::mem::replace(&mut *self.session_name.write(), session_name.to_string());
        info!(from = %previous, to = %session_name, "switched tmux session");
        self.refresh_after("switch-client").await;
        Ok(())
    }

    /// Split the active pane; `horizontal` places the new pane to the right
    pub async fn split_pane(&self, horizontal: bool) -> Result<(), TmuxError> {
        let name = self.session_name();
        let flag = if horizontal { "-h" } else { "-v" };
        self.runner
            .run(&["split-window", "-t", name.as_str(), flag])
            .await?;
        self.refresh_after("split-window").await;
        Ok(())
    }

    pub async fn close_pane(&self, pane_id: &str) -> Result<(), TmuxError> {
        self.runner.run(&["kill-pane", "-t", pane_id]).await?;
        self.refresh_after("kill-pane").await;
        Ok(())
    }

    pub async fn new_window(&self) -> Result<(), TmuxError> {
        let name = self.session_name();
        self.runner.run(&["new-window", "-t", name.as_str()]).await?;
        self.refresh_after("new-window").await;
        Ok(())
    }

    pub async fn enter_copy_mode(&self) -> Result<(), TmuxError> {
        let name = self.session_name();
        self.runner.run(&["copy-mode", "-t", name.as_str()]).await?;
        Ok(())
    }

    pub async fn exit_copy_mode(&self) -> Result<(), TmuxError> {
        self.send_copy_mode_command("cancel").await
    }

    /// Scroll the active pane up `lines` lines. Stops at the first failure.
    pub async fn scroll_up(&self, lines: u32) -> Result<(), TmuxError> {
        for _ in 0..lines {
            self.send_copy_mode_command("scroll-up").await?;
        }
        Ok(())
    }

    pub async fn scroll_down(&self, lines: u32) -> Result<(), TmuxError> {
        for _ in 0..lines {
            self.send_copy_mode_command("scroll-down").await?;
        }
        Ok(())
    }

    async fn send_copy_mode_command(&self, command: &str) -> Result<(), TmuxError> {
        let name = self.session_name();
        self.runner
            .run(&["send-keys", "-t", name.as_str(), "-X", command])
            .await?;
        Ok(())
    }

    /// Copy-mode state of `pane_id`, or of the bound session's active pane
    pub async fn mode_state(&self, pane_id: Option<&str>) -> Result<ModeState, TmuxError> {
        let target = match pane_id {
            Some(id) => id.to_string(),
            None => self.session_name(),
        };
        let format = self.delimiter.format(MODE_FIELDS);
        let out = self
            .runner
            .run(&["display-message", "-t", target.as_str(), "-p", format.as_str()])
            .await?;
        parse::parse_mode_state(&out, self.delimiter)
    }

    /// Run a raw tmux command line such as `rename-window -t @1 "my window"`
    /// and return its output. The layout is refreshed afterwards since the
    /// command may have changed anything.
    pub async fn send_command(&self, command: &str) -> Result<String, TmuxError> {
        let words = shell_words::split(command)
            .map_err(|e| TmuxError::InvalidArgument(format!("{command:?}: {e}")))?;
        if words.is_empty() {
            return Err(TmuxError::InvalidArgument("empty command".to_string()));
        }

        let args: Vec<&str> = words.iter().map(String::as_str).collect();
        let out = self.runner.run(&args).await?;
        self.refresh_after(&words[0]).await;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::stub::StubRunner;

    const PANE_ROW: &str = "%1,0,1,80,24,0,0,bash,terminal\n";

    /// tmux state from a fresh start of session "work"
    fn fresh_stub() -> Arc<StubRunner> {
        let stub = Arc::new(StubRunner::new());
        stub.fail("has-session")
            .ok("new-session", "")
            .ok("display-message", "$0,work\n")
            .ok("list-sessions", "$0,work,1,1\n")
            .ok("list-windows", "@1,main,0,1\n")
            .ok("list-panes", PANE_ROW);
        stub
    }

    async fn started(stub: &Arc<StubRunner>) -> Controller {
        let controller = Controller::with_runner("work", stub.clone());
        controller.start().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn test_fresh_start_creates_session_and_loads_layout() {
        let stub = fresh_stub();
        let controller = started(&stub).await;

        assert_eq!(stub.calls_to("new-session"), vec!["new-session -d -s work"]);

        let layout = controller.get_layout().unwrap();
        assert_eq!(layout.session_id, "$0");
        assert_eq!(layout.session_name, "work");
        assert_eq!(layout.sessions.len(), 1);
        assert!(layout.sessions[0].active);
        assert_eq!(layout.windows.len(), 1);
        assert!(layout.windows[0].active);
        let pane = &layout.windows[0].panes[0];
        assert_eq!(pane.id, "%1");
        assert!(pane.active);
        assert_eq!((pane.width, pane.height), (80, 24));
        assert_eq!(layout.active_window_id, "@1");
        assert_eq!(layout.active_pane_id, "%1");
    }

    #[tokio::test]
    async fn test_start_skips_creation_when_session_exists() {
        let stub = fresh_stub();
        stub.reset("has-session").ok("has-session", "");
        let _controller = started(&stub).await;
        assert!(stub.calls_to("new-session").is_empty());
    }

    #[tokio::test]
    async fn test_start_reports_creation_failure() {
        let stub = fresh_stub();
        stub.reset("new-session").fail("new-session");
        let controller = Controller::with_runner("work", stub.clone());

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, TmuxError::SessionCreationFailed { ref name, .. } if name == "work"));
        assert!(controller.get_layout().is_none());
    }

    #[tokio::test]
    async fn test_start_reports_initial_refresh_failure() {
        let stub = fresh_stub();
        stub.reset("display-message").ok("display-message", "nonsense\n");
        let controller = Controller::with_runner("work", stub.clone());

        let err = controller.start().await.unwrap_err();
        match err {
            TmuxError::RefreshFailed { source } => assert!(matches!(*source, TmuxError::Parse(_))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_session_is_inactive() {
        let stub = fresh_stub();
        stub.reset("list-sessions")
            .ok("list-sessions", "$0,work,1,1\n$1,other,2,0\n");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        assert!(layout.sessions[0].active);
        assert!(!layout.sessions[1].active);
        assert_eq!(layout.sessions[1].windows, 2);
    }

    #[tokio::test]
    async fn test_list_sessions_failure_is_tolerated() {
        let stub = fresh_stub();
        stub.reset("list-sessions").fail("list-sessions");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        assert!(layout.sessions.is_empty());
        assert_eq!(layout.windows.len(), 1);
    }

    #[tokio::test]
    async fn test_split_then_refresh() {
        let stub = fresh_stub();
        let controller = started(&stub).await;

        stub.reset("list-panes")
            .ok("list-panes", "%1,0,0,40,24,0,0,bash,terminal\n%2,1,1,39,24,0,41,bash,terminal\n");
        controller.split_pane(true).await.unwrap();

        assert_eq!(stub.calls_to("split-window"), vec!["split-window -t work -h"]);
        let layout = controller.get_layout().unwrap();
        assert_eq!(layout.windows[0].panes.len(), 2);
        assert_eq!(layout.active_pane_id, "%2");
    }

    #[tokio::test]
    async fn test_vertical_split_flag() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        controller.split_pane(false).await.unwrap();
        assert_eq!(stub.calls_to("split-window"), vec!["split-window -t work -v"]);
    }

    #[tokio::test]
    async fn test_malformed_pane_line_is_skipped() {
        let stub = fresh_stub();
        stub.reset("list-panes")
            .ok("list-panes", "%1,0,1,80,24,0,0,bash\n%2,1,0,80,24,0,0,bash,title\n");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        let panes = &layout.windows[0].panes;
        assert_eq!(panes.len(), 1);
        assert_eq!(panes[0].id, "%2");
        assert_eq!(layout.active_pane_id, "");
    }

    #[tokio::test]
    async fn test_list_panes_failure_keeps_window() {
        let stub = fresh_stub();
        stub.reset("list-panes").fail("list-panes");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        assert_eq!(layout.windows.len(), 1);
        assert!(layout.windows[0].panes.is_empty());
        assert_eq!(layout.active_window_id, "@1");
        assert_eq!(layout.active_pane_id, "");
    }

    #[tokio::test]
    async fn test_fatal_refresh_keeps_cached_layout() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        let before = controller.get_layout().unwrap();

        stub.reset("list-windows").fail("list-windows");
        let err = controller.refresh_layout().await.unwrap_err();
        assert!(matches!(err, TmuxError::RefreshFailed { .. }));

        let after = controller.get_layout().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_switch_session_rebinds() {
        let stub = fresh_stub();
        stub.reset("display-message")
            .ok("display-message", "$0,work\n")
            .ok("display-message", "$1,other\n");
        let controller = started(&stub).await;

        controller.switch_session("other").await.unwrap();

        assert_eq!(stub.calls_to("switch-client"), vec!["switch-client -t other"]);
        assert_eq!(controller.session_name(), "other");
        let last_query = stub.calls_to("display-message").pop().unwrap();
        assert!(last_query.starts_with("display-message -t other -p"));
        assert_eq!(controller.get_layout().unwrap().session_name, "other");
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_binding() {
        let stub = fresh_stub();
        stub.fail("switch-client");
        let controller = started(&stub).await;

        assert!(controller.switch_session("other").await.is_err());
        assert_eq!(controller.session_name(), "work");
    }

    #[tokio::test]
    async fn test_mutation_succeeds_when_refresh_fails() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        let before = controller.get_layout().unwrap();

        stub.reset("list-windows").fail("list-windows");
        controller.select_pane("%1").await.unwrap();

        assert_eq!(stub.calls_to("select-pane"), vec!["select-pane -t %1"]);
        assert!(Arc::ptr_eq(&before, &controller.get_layout().unwrap()));
    }

    #[tokio::test]
    async fn test_failed_mutation_skips_refresh() {
        let stub = fresh_stub();
        stub.fail("kill-pane");
        let controller = started(&stub).await;
        stub.clear_calls();

        let err = controller.close_pane("%1").await.unwrap_err();
        assert!(err.is_subprocess());
        assert_eq!(stub.calls(), vec!["kill-pane -t %1"]);
    }

    #[tokio::test]
    async fn test_window_commands() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        stub.clear_calls();

        controller.select_window("@1").await.unwrap();
        controller.new_window().await.unwrap();

        assert_eq!(stub.calls_to("select-window"), vec!["select-window -t @1"]);
        assert_eq!(stub.calls_to("new-window"), vec!["new-window -t work"]);
        assert_eq!(stub.calls_to("list-windows").len(), 2);
    }

    #[tokio::test]
    async fn test_copy_mode_does_not_refresh() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        stub.clear_calls();

        controller.enter_copy_mode().await.unwrap();
        controller.exit_copy_mode().await.unwrap();

        assert_eq!(
            stub.calls(),
            vec!["copy-mode -t work", "send-keys -t work -X cancel"]
        );
    }

    #[tokio::test]
    async fn test_scroll_zero_runs_nothing() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        stub.clear_calls();

        controller.scroll_up(0).await.unwrap();
        controller.scroll_down(0).await.unwrap();
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scroll_repeats_command() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        stub.clear_calls();

        controller.scroll_down(3).await.unwrap();
        assert_eq!(stub.calls(), vec!["send-keys -t work -X scroll-down"; 3]);
    }

    #[tokio::test]
    async fn test_scroll_stops_at_first_error() {
        let stub = fresh_stub();
        stub.fail("send-keys");
        let controller = started(&stub).await;
        stub.clear_calls();

        assert!(controller.scroll_up(5).await.is_err());
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_windows() {
        let stub = fresh_stub();
        stub.reset("list-windows").ok("list-windows", "");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        assert!(layout.windows.is_empty());
        assert_eq!(layout.active_window_id, "");
        assert_eq!(layout.active_pane_id, "");
        assert!(stub.calls_to("list-panes").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_active_flags_first_wins() {
        let stub = fresh_stub();
        stub.reset("list-windows")
            .ok("list-windows", "@1,main,0,1\n@2,logs,1,1\n");
        stub.reset("list-panes")
            .ok("list-panes", "%1,0,1,40,24,0,0,bash,a\n%2,1,1,39,24,0,41,bash,b\n");
        let controller = started(&stub).await;

        let layout = controller.get_layout().unwrap();
        assert_eq!(layout.active_window_id, "@1");
        assert_eq!(layout.active_pane_id, "%1");
        assert_eq!(layout.windows.iter().filter(|w| w.active).count(), 1);
        for window in &layout.windows {
            assert!(window.panes.iter().filter(|p| p.active).count() <= 1);
        }
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        let first = serde_json::to_string(&*controller.get_layout().unwrap()).unwrap();

        controller.refresh_layout().await.unwrap();
        let second = serde_json::to_string(&*controller.get_layout().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unit_separator_format_strings() {
        let stub = Arc::new(StubRunner::new());
        stub.ok("display-message", "$0\u{1f}work\n")
            .ok("list-windows", "@1\u{1f}a,b\u{1f}0\u{1f}1\n");
        let controller =
            Controller::with_runner("work", stub.clone()).with_delimiter(Delimiter::UnitSeparator);
        controller.refresh_layout().await.unwrap();

        assert!(stub.calls_to("display-message")[0].ends_with("#{session_id}\u{1f}#{session_name}"));
        assert_eq!(controller.get_layout().unwrap().windows[0].name, "a,b");
    }

    #[tokio::test]
    async fn test_mode_state_targets_pane_or_session() {
        let stub = fresh_stub();
        let controller = started(&stub).await;
        stub.reset("display-message").ok("display-message", "%1,1,3,200\n");
        stub.clear_calls();

        let state = controller.mode_state(None).await.unwrap();
        assert_eq!(state.pane_id, "%1");
        assert!(state.in_copy_mode);
        assert_eq!(state.scroll_position, 3);

        controller.mode_state(Some("%7")).await.unwrap();
        let calls = stub.calls();
        assert!(calls[0].starts_with("display-message -t work -p"));
        assert!(calls[1].starts_with("display-message -t %7 -p"));
    }

    #[tokio::test]
    async fn test_send_command_splits_words() {
        let stub = fresh_stub();
        stub.ok("rename-window", "");
        let controller = started(&stub).await;

        controller
            .send_command(r#"rename-window -t @1 "my window""#)
            .await
            .unwrap();
        assert_eq!(stub.calls_to("rename-window"), vec!["rename-window -t @1 my window"]);

        assert!(matches!(
            controller.send_command("   ").await,
            Err(TmuxError::InvalidArgument(_))
        ));
        assert!(matches!(
            controller.send_command("rename-window \"unterminated").await,
            Err(TmuxError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let controller = Controller::with_runner("work", Arc::new(StubRunner::new()));
        let mut rx = controller.events();
        let tx = controller.event_sender().unwrap();

        tx.send(Event::new("%window-add", "@2")).unwrap();
        tx.send(Event::new("%layout-change", "@2 abcd")).unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, "%window-add");
        assert_eq!(rx.recv().await.unwrap().payload, "@2 abcd");
    }

    #[tokio::test]
    async fn test_stop_closes_events_and_is_idempotent() {
        let controller = Controller::with_runner("work", Arc::new(StubRunner::new()));
        let mut rx = controller.events();
        let mut signal = controller.shutdown_signal();

        controller.stop();
        controller.stop();

        assert!(controller.is_stopped());
        assert!(*signal.borrow_and_update());
        assert!(controller.event_sender().is_none());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert!(matches!(
            controller.events().recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn test_from_config_binds_session() {
        let config = Config {
            session_name: "dev".to_string(),
            ..Config::default()
        };
        let controller = Controller::from_config(&config);
        assert_eq!(controller.session_name(), "dev");
        assert!(controller.get_layout().is_none());
        assert!(!controller.is_stopped());
    }
}
