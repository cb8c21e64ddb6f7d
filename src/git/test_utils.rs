//! Shared test utilities for code that talks to a [`CommandGateway`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use super::gateway::{CommandGateway, CommandOutput, GatewayError, GatewayFuture, Invocation};

/// Canned reply for a matched invocation.
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// The process ran and produced this output.
    Output(CommandOutput),
    /// The program could not be started.
    Unavailable,
}

#[derive(Clone, Debug)]
struct Rule {
    repo: Option<String>,
    prefix: String,
    reply: Reply,
}

/// In-memory gateway answering from a list of prefix rules.
///
/// A rule matches when the invocation's command line starts with its prefix
/// and, for repo-scoped rules, the working directory's final component equals
/// the repository name. Rules added later win. Unmatched invocations succeed
/// with empty output.
///
/// Every invocation is recorded; use [`invocation_handle`](Self::invocation_handle)
/// to read them after the gateway has been moved behind an `Arc`.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedGateway {
    rules: Vec<Rule>,
    recorded: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, repo: Option<&str>, prefix: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            repo: repo.map(str::to_string),
            prefix: prefix.to_string(),
            reply,
        });
        self
    }

    /// Answers matching invocations with a zero exit and `stdout`.
    pub(crate) fn succeed(self, prefix: &str, stdout: &str) -> Self {
        self.rule(None, prefix, Reply::Output(CommandOutput::ok(stdout)))
    }

    /// Answers matching invocations with exit code 1 and `stderr`.
    pub(crate) fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.rule(None, prefix, Reply::Output(CommandOutput::failed(stderr)))
    }

    /// Makes matching invocations fail to spawn.
    pub(crate) fn unavailable(self, prefix: &str) -> Self {
        self.rule(None, prefix, Reply::Unavailable)
    }

    /// Like [`succeed`](Self::succeed), restricted to one repository directory.
    pub(crate) fn succeed_in(self, repo: &str, prefix: &str, stdout: &str) -> Self {
        self.rule(Some(repo), prefix, Reply::Output(CommandOutput::ok(stdout)))
    }

    /// Like [`fail`](Self::fail), restricted to one repository directory.
    pub(crate) fn fail_in(self, repo: &str, prefix: &str, stderr: &str) -> Self {
        self.rule(Some(repo), prefix, Reply::Output(CommandOutput::failed(stderr)))
    }

    pub(crate) fn invocation_handle(&self) -> InvocationHandle {
        InvocationHandle {
            recorded: self.recorded.clone(),
        }
    }

    fn reply_for(&self, invocation: &Invocation) -> Reply {
        let line = invocation.command_line();
        let dir_name = invocation
            .cwd
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        self.rules
            .iter()
            .rev()
            .find(|rule| {
                line.starts_with(&rule.prefix)
                    && rule
                        .repo
                        .as_ref()
                        .map_or(true, |repo| dir_name.as_deref() == Some(repo.as_str()))
            })
            .map_or_else(|| Reply::Output(CommandOutput::ok("")), |rule| rule.reply.clone())
    }
}

impl CommandGateway for ScriptedGateway {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> GatewayFuture<'a> {
        Box::pin(async move {
            self.recorded.lock().unwrap().push(invocation.clone());
            match self.reply_for(invocation) {
                Reply::Output(output) => Ok(output),
                Reply::Unavailable => Err(GatewayError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
            }
        })
    }
}

/// Shared handle to a scripted gateway's recorded invocations.
#[derive(Clone, Debug)]
pub(crate) struct InvocationHandle {
    recorded: Arc<Mutex<Vec<Invocation>>>,
}

impl InvocationHandle {
    /// Returns every recorded command line, in call order.
    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Returns every recorded invocation, in call order.
    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.recorded.lock().unwrap().clone()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub(crate) fn ran(&self, prefix: &str) -> bool {
        self.command_lines()
            .iter()
            .any(|line| line.starts_with(prefix))
    }
}
