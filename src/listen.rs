//! Utterance capture
//!
//! Speech-to-text itself is an external collaborator. Pika either reads
//! typed lines or runs a transcriber program that prints one utterance.

use crate::exec::run_with_timeout;
use std::io::{self, BufRead, StdinLock, Write};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Result of one capture
#[derive(Debug, Clone, PartialEq)]
pub enum Heard {
    Text(String),
    /// Empty, unintelligible or timed out
    Nothing,
    /// The recognition service could not be reached
    Unavailable(String),
    /// No more input will ever arrive
    Closed,
}

impl Heard {
    fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Heard::Nothing
        } else {
            Heard::Text(text.to_string())
        }
    }
}

pub trait Ears {
    /// Block until one utterance was captured or capture gave up
    fn capture(&mut self) -> Heard;
}

/// Typed lines, one utterance per line
pub struct ConsoleEars<R> {
    reader: R,
    prompt: bool,
}

impl ConsoleEars<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            reader: io::stdin().lock(),
            prompt: true,
        }
    }
}

impl<R: BufRead> ConsoleEars<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            prompt: false,
        }
    }
}

impl<R: BufRead> Ears for ConsoleEars<R> {
    fn capture(&mut self) -> Heard {
        if self.prompt {
            print!("> ");
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Heard::Closed,
            Ok(_) => Heard::from_text(&line),
            Err(e) => Heard::Unavailable(format!("cannot read input: {}", e)),
        }
    }
}

/// External transcriber; each run records and prints one utterance
pub struct CommandEars {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEars {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl Ears for CommandEars {
    fn capture(&mut self) -> Heard {
        if self.program.is_empty() {
            return Heard::Unavailable("no recognizer program configured".into());
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        match run_with_timeout(&mut command, self.timeout) {
            Err(e) => Heard::Unavailable(format!("cannot run {}: {}", self.program, e)),
            Ok(None) => {
                debug!(program = %self.program, "recognizer timed out");
                Heard::Nothing
            }
            Ok(Some(output)) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = match stderr.trim() {
                    "" => format!("{} exited with {}", self.program, output.status),
                    message => message.to_string(),
                };
                Heard::Unavailable(reason)
            }
            Ok(Some(output)) => Heard::from_text(&String::from_utf8_lossy(&output.stdout)),
        }
    }
}
