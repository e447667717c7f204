//! External command execution.
//!
//! Every tool the pipeline launches goes through a [`CommandRunner`], which
//! returns a structured [`CommandOutput`] instead of a bare success flag. The
//! production implementation is [`SystemRunner`]; tests substitute a
//! recording runner.

use std::fmt;
use std::process::{Command, ExitStatus};

use crate::types::BuildError;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    /// Shell-like rendering; arguments containing whitespace or quotes are single-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty() && !word.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Outcome of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
    /// Captured stdout (empty when output was streamed).
    pub stdout: String,
    /// Captured stderr (empty when output was streamed).
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with no captured output.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    /// A failed run exiting with `code`.
    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
            ..Self::default()
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
            ..Self::default()
        }
    }

    /// Human-readable exit status, e.g. `exit status: 2`.
    pub fn status_description(&self) -> String {
        match self.code {
            Some(code) => format!("exit status: {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// Turns an unsuccessful output into [`BuildError::CommandFailed`].
    pub fn check(self, invocation: &Invocation) -> Result<CommandOutput, BuildError> {
        if self.success {
            return Ok(self);
        }
        Err(BuildError::CommandFailed {
            command: invocation.to_string(),
            status: self.status_description(),
            stderr: self.stderr,
        })
    }
}

/// Capability to run an external command in the current working directory.
pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// Returns `Err` only when the command could not be started; a command
    /// that ran and failed is reported through [`CommandOutput::success`].
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, BuildError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, BuildError> {
        (**self).run(invocation)
    }
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    capture: bool,
}

impl SystemRunner {
    /// Streams child output straight to the terminal.
    pub fn new() -> Self {
        Self { capture: false }
    }

    /// Captures child output into [`CommandOutput`] instead of streaming it.
    pub fn capturing() -> Self {
        Self { capture: true }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, BuildError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        tracing::debug!(command = %invocation, capture = self.capture, "spawning");

        let spawn_err = |source| BuildError::Spawn {
            command: invocation.to_string(),
            source,
        };

        let output = if self.capture {
            let output = cmd.output().map_err(spawn_err)?;
            CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                ..CommandOutput::from_status(output.status)
            }
        } else {
            CommandOutput::from_status(cmd.status().map_err(spawn_err)?)
        };

        tracing::debug!(command = %invocation, code = ?output.code, success = output.success, "finished");
        Ok(output)
    }
}
