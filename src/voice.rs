//! Speech output

use crate::exec::run_with_timeout;
use std::process::Command;
use std::time::Duration;
use tracing::warn;

pub trait Voice {
    /// Speak `text` at `rate` words per minute, blocking until done.
    /// Failures are logged, never returned.
    fn speak(&mut self, text: &str, rate: u32);
}

/// espeak / espeak-ng subprocess
pub struct EspeakVoice {
    program: String,
    voice: Option<String>,
    timeout: Duration,
}

impl EspeakVoice {
    pub fn new(program: impl Into<String>, voice: Option<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            voice,
            timeout,
        }
    }

    fn command(&self, text: &str, rate: u32) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-s").arg(rate.to_string());
        if let Some(voice) = &self.voice {
            command.arg("-v").arg(voice);
        }
        command.arg("--").arg(text);
        command
    }
}

impl Voice for EspeakVoice {
    fn speak(&mut self, text: &str, rate: u32) {
        match run_with_timeout(&mut self.command(text, rate), self.timeout) {
            Ok(Some(output)) if output.status.success() => {}
            Ok(Some(output)) => warn!(
                "{} failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Ok(None) => warn!("{} timed out after {:?}", self.program, self.timeout),
            Err(e) => warn!("cannot run {}: {}", self.program, e),
        }
    }
}

/// Silent voice; replies still appear in the transcript
#[derive(Debug, Default)]
pub struct ConsoleVoice;

impl Voice for ConsoleVoice {
    fn speak(&mut self, _text: &str, _rate: u32) {}
}
