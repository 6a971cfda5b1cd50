//! Format strings sent to tmux and parsers for the tables it prints back.
//!
//! Every query asks tmux for one record per line with fields joined by a
//! [`Delimiter`]. Malformed rows are skipped, integer fields that fail to
//! parse read as zero, and boolean fields are true only for `"1"`.

use serde::{Deserialize, Serialize};

use super::{ModeState, Pane, Session, TmuxError, Window};

pub(crate) const SESSION_IDENTITY_FIELDS: &[&str] = &["session_id", "session_name"];

pub(crate) const SESSION_FIELDS: &[&str] = &[
    "session_id",
    "session_name",
    "session_windows",
    "session_attached",
];

pub(crate) const WINDOW_FIELDS: &[&str] =
    &["window_id", "window_name", "window_index", "window_active"];

pub(crate) const PANE_FIELDS: &[&str] = &[
    "pane_id",
    "pane_index",
    "pane_active",
    "pane_width",
    "pane_height",
    "pane_top",
    "pane_left",
    "pane_current_command",
    "pane_title",
];

pub(crate) const MODE_FIELDS: &[&str] =
    &["pane_id", "pane_in_mode", "scroll_position", "history_size"];

/// Separator placed between fields in tmux format strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Delimiter {
    /// `,` as tmux users usually write it. Commas inside names shift fields.
    #[default]
    Comma,
    /// ASCII unit separator (0x1F), which never shows up in names or titles
    UnitSeparator,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::UnitSeparator => '\u{1f}',
        }
    }

    /// Build a `-F` format string such as `#{window_id},#{window_name}`
    pub fn format(self, fields: &[&str]) -> String {
        let mut out = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(self.as_char());
            }
            out.push_str("#{");
            out.push_str(field);
            out.push('}');
        }
        out
    }
}

/// Non-empty lines of a tmux table
fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.trim().split('\n').filter(|line| !line.is_empty())
}

/// Split a record whose free-text field sits between `head` leading and
/// `tail` trailing fixed fields. Extra delimiters end up in the free-text field.
fn split_around<'a>(
    line: &'a str,
    delim: Delimiter,
    head: usize,
    tail: usize,
) -> Option<Vec<&'a str>> {
    let sep = delim.as_char();
    let mut fields = Vec::with_capacity(head + tail + 1);
    let mut rest = line;
    for _ in 0..head {
        let (field, remainder) = rest.split_once(sep)?;
        fields.push(field);
        rest = remainder;
    }

    let mut trailing: Vec<&str> = rest.rsplitn(tail + 1, sep).collect();
    if trailing.len() != tail + 1 {
        return None;
    }
    trailing.reverse();
    fields.extend(trailing);
    Some(fields)
}

fn parse_int(field: &str) -> u32 {
    field.parse().unwrap_or(0)
}

fn parse_flag(field: &str) -> bool {
    field == "1"
}

/// Parse `display-message -p "#{session_id},#{session_name}"` into `(id, name)`.
/// Exactly two non-empty fields are accepted.
pub(crate) fn parse_session_identity(
    output: &str,
    delim: Delimiter,
) -> Result<(String, String), TmuxError> {
    let parts: Vec<&str> = output.trim().split(delim.as_char()).collect();
    match parts.as_slice() {
        [id, name] if !id.is_empty() && !name.is_empty() => Ok((id.to_string(), name.to_string())),
        _ => Err(TmuxError::Parse(output.to_string())),
    }
}

/// Parse `list-sessions`; `bound` marks which session is active
pub(crate) fn parse_sessions(output: &str, delim: Delimiter, bound: &str) -> Vec<Session> {
    lines(output)
        .filter_map(|line| {
            let parts = split_around(line, delim, 1, 2)?;
            Some(Session {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                windows: parts[2].parse().unwrap_or(0),
                attached: parse_flag(parts[3]),
                active: parts[1] == bound,
            })
        })
        .collect()
}

/// Parse `list-windows`; returned windows have no panes yet
pub(crate) fn parse_windows(output: &str, delim: Delimiter) -> Vec<Window> {
    lines(output)
        .filter_map(|line| {
            let parts = split_around(line, delim, 1, 2)?;
            Some(Window {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                index: parse_int(parts[2]),
                active: parse_flag(parts[3]),
                panes: Vec::new(),
            })
        })
        .collect()
}

/// Parse `list-panes`
pub(crate) fn parse_panes(output: &str, delim: Delimiter) -> Vec<Pane> {
    lines(output)
        .filter_map(|line| {
            let parts = split_around(line, delim, PANE_FIELDS.len() - 1, 0)?;
            Some(Pane {
                id: parts[0].to_string(),
                index: parse_int(parts[1]),
                active: parse_flag(parts[2]),
                width: parse_int(parts[3]),
                height: parse_int(parts[4]),
                top: parse_int(parts[5]),
                left: parse_int(parts[6]),
                command: parts[7].to_string(),
                title: parts[8].to_string(),
            })
        })
        .collect()
}

/// Parse the copy-mode query for a single pane
pub(crate) fn parse_mode_state(output: &str, delim: Delimiter) -> Result<ModeState, TmuxError> {
    let line = output.trim();
    let parts: Vec<&str> = line.split(delim.as_char()).collect();
    if parts.len() != MODE_FIELDS.len() || parts[0].is_empty() {
        return Err(TmuxError::Parse(output.to_string()));
    }

    let history_size = parse_int(parts[3]);
    Ok(ModeState {
        pane_id: parts[0].to_string(),
        in_copy_mode: parse_flag(parts[1]),
        scroll_position: parse_int(parts[2]).min(history_size),
        history_size,
    })
}
