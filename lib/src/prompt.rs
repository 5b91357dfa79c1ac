//! Asking the operator for confirmation.

use std::io::{Read, Write};

use anyhow::{Context, Result};

/// A source of yes/no answers.
pub(crate) trait Confirm {
    /// Present `prompt` and return whether the answer was affirmative.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Prints the prompt and reads a single byte as the answer; only `y` or
/// `Y` count as yes. End of input counts as no.
///
/// Not built on `dialoguer`: its confirm prompts require a terminal and
/// only accept y/n, while here any other key (or piped input) must decline.
#[derive(Debug)]
pub(crate) struct ReaderPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: Read, W: Write> ReaderPrompt<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ReaderPrompt<std::io::Stdin, std::io::Stdout> {
    /// Prompt on the controlling terminal (stdin/stdout).
    pub(crate) fn terminal() -> Self {
        Self::new(std::io::stdin(), std::io::stdout())
    }
}

impl<R: Read, W: Write> Confirm for ReaderPrompt<R, W> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        writeln!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut buf = [0u8; 1];
        let n = loop {
            match self.input.read(&mut buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                r => break r.context("Reading confirmation")?,
            }
        };
        let answer = n == 1 && buf[0].eq_ignore_ascii_case(&b'y');
        tracing::debug!("Confirmation answer: {answer}");
        Ok(answer)
    }
}

/// Answers every prompt the same way, e.g. for `--assume-yes`.
#[derive(Debug)]
pub(crate) struct AssumeAnswer(pub(crate) bool);

impl Confirm for AssumeAnswer {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        tracing::debug!("Assuming {} for: {prompt}", self.0);
        Ok(self.0)
    }
}
