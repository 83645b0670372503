//! Recording fakes for the session's capabilities

#![allow(dead_code)]

use pika::desktop::{Desktop, DesktopError, Key};
use pika::learning::{LearningState, MemoryStore};
use pika::listen::{Ears, Heard};
use pika::session::{Session, SessionOptions};
use pika::voice::Voice;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NOTES_DIR: &str = "/notes";

pub fn options() -> SessionOptions {
    let mut options = SessionOptions::default();
    options.name = "Pika".into();
    options.editor.display_name = "Notepad".into();
    options.editor.process = "notepad.exe".into();
    options.editor.launch = "notepad.exe".into();
    options.editor.window = None;
    options.editor.notes_dir = NOTES_DIR.into();
    options.editor.default_note = "notes".into();
    options.editor.launch_wait_ms = 0;
    options.retry_delay = Duration::ZERO;
    options.echo = false;
    options
}

#[derive(Default)]
pub struct ScriptedEars {
    script: VecDeque<Heard>,
}

impl ScriptedEars {
    pub fn new(script: Vec<Heard>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn texts(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| Heard::Text(l.to_string())).collect())
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Ears for ScriptedEars {
    fn capture(&mut self) -> Heard {
        self.script.pop_front().unwrap_or(Heard::Closed)
    }
}

#[derive(Default)]
pub struct RecordingVoice {
    pub lines: Vec<(String, u32)>,
}

impl RecordingVoice {
    pub fn spoken(&self) -> Vec<&str> {
        self.lines.iter().map(|(text, _)| text.as_str()).collect()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(|(text, _)| text.as_str())
    }
}

impl Voice for RecordingVoice {
    fn speak(&mut self, text: &str, rate: u32) {
        self.lines.push((text.to_string(), rate));
    }
}

/// Desktop with a fixed set of windows, processes and files
#[derive(Default)]
pub struct FakeDesktop {
    pub windows: Vec<String>,
    pub running: Vec<String>,
    pub files: HashMap<PathBuf, String>,
    pub keyboard_broken: bool,

    pub focused: Vec<Option<String>>,
    pub typed: Vec<String>,
    pub hotkeys: Vec<Vec<Key>>,
    pub launched: Vec<String>,
    pub terminated: Vec<String>,
}

impl FakeDesktop {
    pub fn with_windows(windows: &[&str]) -> Self {
        Self {
            windows: windows.iter().map(|w| w.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Notepad running with its window open
    pub fn with_editor() -> Self {
        let mut desktop = Self::with_windows(&["Notepad"]);
        desktop.running.push("notepad.exe".into());
        desktop
    }

    pub fn note(mut self, name: &str, text: &str) -> Self {
        self.files
            .insert(Path::new(NOTES_DIR).join(format!("{}.txt", name)), text.into());
        self
    }
}

impl Desktop for FakeDesktop {
    fn focus_window(&mut self, target: Option<&str>) -> bool {
        self.focused.push(target.map(String::from));
        let title = target.unwrap_or("Notepad");
        self.windows.iter().any(|w| w == title)
    }

    fn type_text(&mut self, text: &str) -> Result<(), DesktopError> {
        if self.keyboard_broken {
            return Err(DesktopError::Keyboard("no display".into()));
        }
        self.typed.push(text.to_string());
        Ok(())
    }

    fn send_hotkey(&mut self, keys: &[Key]) -> Result<(), DesktopError> {
        if self.keyboard_broken {
            return Err(DesktopError::Keyboard("no display".into()));
        }
        self.hotkeys.push(keys.to_vec());
        Ok(())
    }

    fn is_process_running(&mut self, name: &str) -> bool {
        self.running.iter().any(|p| p == name)
    }

    fn launch_process(&mut self, program: &str) -> bool {
        self.launched.push(program.to_string());
        self.running.push(program.to_string());
        self.windows.push("Notepad".into());
        true
    }

    fn terminate_process(&mut self, name: &str) -> bool {
        let before = self.running.len();
        self.running.retain(|p| p != name);
        self.windows.retain(|w| w != "Notepad");
        self.terminated.push(name.to_string());
        self.running.len() < before
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }
}

/// Fakes plus an in-memory store, ready to build a session
pub struct Harness {
    pub options: SessionOptions,
    pub ears: ScriptedEars,
    pub voice: RecordingVoice,
    pub desktop: FakeDesktop,
    pub store: MemoryStore,
}

impl Harness {
    pub fn new(desktop: FakeDesktop) -> Self {
        Self {
            options: options(),
            ears: ScriptedEars::default(),
            voice: RecordingVoice::default(),
            desktop,
            store: MemoryStore::new(),
        }
    }

    pub fn session(&mut self) -> Session<'_> {
        Session::new(
            self.options.clone(),
            &mut self.ears,
            &mut self.voice,
            &mut self.desktop,
            &mut self.store,
        )
    }

    /// Run a full session over `lines`
    pub fn run(&mut self, state: &mut LearningState, lines: &[&str]) -> usize {
        self.ears = ScriptedEars::texts(lines);
        self.session().run(state)
    }

    /// Handle `lines` as turns without the startup greeting
    pub fn say(&mut self, state: &mut LearningState, lines: &[&str]) {
        let mut session = self.session();
        for line in lines {
            session.handle(state, line);
        }
    }
}
