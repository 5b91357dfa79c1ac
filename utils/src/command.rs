//! Helpers intended for [`std::process::Command`].

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

/// Errors from executing a child process.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be found.
    #[error("Required executable not found: {program}")]
    MissingExecutable {
        /// The program that was requested
        program: String,
    },
    /// The child process could not be spawned for another reason.
    #[error("Failed to spawn {program}")]
    Spawn {
        /// The program that was requested
        program: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// The child process exited unsuccessfully.
    #[error("Subprocess failed: {cmdline}: {status}{}", render_stderr(.stderr))]
    Failed {
        /// The quoted command line
        cmdline: String,
        /// The exit status
        status: ExitStatus,
        /// Captured standard error, if it was captured
        stderr: Option<String>,
    },
}

fn render_stderr(stderr: &Option<String>) -> String {
    match stderr.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => format!("\n{s}"),
        _ => String::new(),
    }
}

fn quote(s: &OsStr) -> String {
    let s = s.to_string_lossy();
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c))
    {
        return s.into_owned();
    }
    shlex::try_quote(&s)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| format!("{s:?}"))
}

fn spawn_error(cmd: &Command, e: std::io::Error) -> CommandError {
    let program = cmd.get_program().to_string_lossy().into_owned();
    if e.kind() == ErrorKind::NotFound {
        CommandError::MissingExecutable { program }
    } else {
        CommandError::Spawn { program, source: e }
    }
}

/// Helpers intended for [`std::process::Command`].
pub trait CommandRunExt {
    /// Log (at debug level) the full child commandline.
    fn log_debug(&mut self) -> &mut Self;

    /// Render the program and its arguments as a shell-quoted string.
    fn to_string_pretty(&self) -> String;

    /// Synchronously execute the child, and return an error if the child
    /// exited unsuccessfully. Standard streams are left as configured.
    fn run(&mut self) -> Result<()>;

    /// Like [`Self::run`], but adds the full command line as error context.
    fn run_with_cmd_context(&mut self) -> Result<()>;

    /// Execute the child process, capturing its standard output as UTF-8.
    /// Standard error is captured too and included in the error on failure.
    fn run_get_string(&mut self) -> Result<String>;
}

impl CommandRunExt for Command {
    fn log_debug(&mut self) -> &mut Self {
        tracing::debug!("exec: {}", self.to_string_pretty());
        self
    }

    fn to_string_pretty(&self) -> String {
        std::iter::once(self.get_program())
            .chain(self.get_args())
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&mut self) -> Result<()> {
        self.log_debug();
        let status = self.status().map_err(|e| spawn_error(self, e))?;
        if !status.success() {
            return Err(CommandError::Failed {
                cmdline: self.to_string_pretty(),
                status,
                stderr: None,
            }
            .into());
        }
        Ok(())
    }

    fn run_with_cmd_context(&mut self) -> Result<()> {
        let cmdline = self.to_string_pretty();
        self.run().with_context(|| format!("Running {cmdline}"))
    }

    fn run_get_string(&mut self) -> Result<String> {
        self.log_debug();
        let o = self
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| spawn_error(self, e))?;
        if !o.status.success() {
            return Err(CommandError::Failed {
                cmdline: self.to_string_pretty(),
                status: o.status,
                stderr: Some(String::from_utf8_lossy(&o.stderr).into_owned()),
            }
            .into());
        }
        String::from_utf8(o.stdout)
            .with_context(|| format!("Decoding output of {}", self.to_string_pretty()))
    }
}
