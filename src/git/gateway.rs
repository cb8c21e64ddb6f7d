//! External command gateway.
//!
//! Every subprocess the crate starts (`git`, `gh`, `onefetch`, `ai_commit`)
//! goes through [`CommandGateway`]. Each [`Invocation`] carries its own
//! working directory, so nothing in the crate ever changes the process-wide
//! current directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// A single subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute, resolved through `PATH`.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory of the child process.
    pub cwd: PathBuf,
}

impl Invocation {
    /// Creates an invocation of `program` inside `cwd`.
    pub fn new<I, S>(program: &str, args: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Creates a `git` invocation inside `cwd`.
    pub fn git<I, S>(args: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args, cwd)
    }

    /// Returns the command line as a single space-separated string.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns a successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Returns a failed output with exit code 1 and the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Describes why the process failed, preferring its stderr.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Errors raised before a subprocess could report an exit status.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The program could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish within the configured timeout.
    #[error("`{program}` timed out after {}s", .after.as_secs())]
    TimedOut {
        /// Program that was killed.
        program: String,
        /// The timeout that elapsed.
        after: Duration,
    },
}

/// Boxed future returned by [`CommandGateway::run`].
pub type GatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, GatewayError>> + Send + 'a>>;

/// Runs external commands and captures their output.
pub trait CommandGateway: Send + Sync {
    /// Runs the invocation to completion.
    fn run<'a>(&'a self, invocation: &'a Invocation) -> GatewayFuture<'a>;
}

/// Gateway backed by real OS processes.
#[derive(Debug, Clone, Default)]
pub struct SystemGateway {
    timeout: Option<Duration>,
}

impl SystemGateway {
    /// Creates a gateway without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that kills any subprocess running longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandGateway for SystemGateway {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> GatewayFuture<'a> {
        Box::pin(async move {
            debug!(
                command = %invocation.command_line(),
                cwd = %invocation.cwd.display(),
                "Running external command"
            );

            let mut command = Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .current_dir(&invocation.cwd)
                .stdin(Stdio::null())
                .kill_on_drop(true);

            let spawn_error = |source| GatewayError::Spawn {
                program: invocation.program.clone(),
                source,
            };

            let output = match self.timeout {
                Some(after) => tokio::time::timeout(after, command.output())
                    .await
                    .map_err(|_| {
                        warn!(command = %invocation.command_line(), ?after, "External command timed out");
                        GatewayError::TimedOut {
                            program: invocation.program.clone(),
                            after,
                        }
                    })?
                    .map_err(spawn_error)?,
                None => command.output().await.map_err(spawn_error)?,
            };

            let result = CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };

            debug!(
                command = %invocation.command_line(),
                code = ?result.code,
                stdout_len = result.stdout.len(),
                "External command finished"
            );

            Ok(result)
        })
    }
}
