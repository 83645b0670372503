//! Desktop automation: window focus, keystrokes, processes and note files
//!
//! The session only talks to the [`Desktop`] trait so that tests can
//! substitute a recording fake.

#[cfg(feature = "typing")]
mod input;
mod system;

pub use system::SystemDesktop;

use std::path::Path;
use thiserror::Error;

/// Keys the assistant sends as hotkeys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Control,
    Alt,
    Meta,
    Shift,
    Backspace,
    Char(char),
}

impl Key {
    /// Cmd on macOS, Ctrl elsewhere
    pub fn command_modifier() -> Key {
        #[cfg(target_os = "macos")]
        {
            Key::Meta
        }
        #[cfg(not(target_os = "macos"))]
        {
            Key::Control
        }
    }

    /// Word-wise backspace: Option+Backspace on macOS, Ctrl+Backspace elsewhere
    pub fn delete_word() -> [Key; 2] {
        #[cfg(target_os = "macos")]
        {
            [Key::Alt, Key::Backspace]
        }
        #[cfg(not(target_os = "macos"))]
        {
            [Key::Control, Key::Backspace]
        }
    }

    pub fn select_all() -> [Key; 2] {
        [Key::command_modifier(), Key::Char('a')]
    }
}

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("keyboard error: {0}")]
    Keyboard(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

pub trait Desktop {
    /// Activate the window whose title contains `target`, or the editor's
    /// own window for `None`. True if one was found.
    fn focus_window(&mut self, target: Option<&str>) -> bool;

    fn type_text(&mut self, text: &str) -> Result<(), DesktopError>;

    /// Press `keys` together; all but the last are held as modifiers
    fn send_hotkey(&mut self, keys: &[Key]) -> Result<(), DesktopError>;

    fn is_process_running(&mut self, name: &str) -> bool;

    fn launch_process(&mut self, program: &str) -> bool;

    /// True if at least one matching process was signalled
    fn terminate_process(&mut self, name: &str) -> bool;

    fn read_file(&self, path: &Path) -> Option<String>;
}
