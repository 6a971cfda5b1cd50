//! Canned multiplexer for controller tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::{CommandRunner, TmuxError};

type Reply = Result<String, String>;

/// Answers tmux invocations by verb and records every command line.
///
/// Each verb has a queue of replies; the last reply is sticky so a single
/// canned answer serves repeated refreshes. Unknown verbs succeed with no
/// output.
#[derive(Default)]
pub(crate) struct StubRunner {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl StubRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ok(&self, verb: &str, stdout: &str) -> &Self {
        self.push(verb, Ok(stdout.to_string()))
    }

    pub(crate) fn fail(&self, verb: &str) -> &Self {
        self.push(verb, Err(format!("{verb} exited 1")))
    }

    /// Drop queued replies for `verb` before pushing new ones
    pub(crate) fn reset(&self, verb: &str) -> &Self {
        self.replies.lock().remove(verb);
        self
    }

    fn push(&self, verb: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .entry(verb.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_to(&self, verb: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(verb))
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let command = args.join(" ");
        self.calls.lock().push(command.clone());

        let verb = args.first().copied().unwrap_or_default();
        let reply = {
            let mut replies = self.replies.lock();
            match replies.get_mut(verb) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(stderr)) => Err(TmuxError::Subprocess {
                command,
                status: "exit status: 1".to_string(),
                stderr,
            }),
            None => Ok(String::new()),
        }
    }
}
