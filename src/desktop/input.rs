//! Keyboard input using enigo
//!
//! Two ways of getting text into the focused window:
//! - **Direct**: enigo's native text input
//! - **Clipboard**: copy the text, then send Cmd/Ctrl+V

use super::{DesktopError, Key};
use crate::config::InputMethod;
use arboard::Clipboard;
use enigo::{Direction, Enigo, Key as EnigoKey, Keyboard, Settings};
use std::thread;
use std::time::Duration;
use tracing::warn;

fn to_enigo(key: Key) -> EnigoKey {
    match key {
        Key::Control => EnigoKey::Control,
        Key::Alt => EnigoKey::Alt,
        Key::Meta => EnigoKey::Meta,
        Key::Shift => EnigoKey::Shift,
        Key::Backspace => EnigoKey::Backspace,
        Key::Char(c) => EnigoKey::Unicode(c),
    }
}

pub struct KeyboardInput {
    enigo: Enigo,
    method: InputMethod,
}

impl KeyboardInput {
    pub fn new(method: InputMethod) -> Result<Self, DesktopError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| DesktopError::Keyboard(format!("failed to initialize enigo: {}", e)))?;
        Ok(Self { enigo, method })
    }

    pub fn type_text(&mut self, text: &str) -> Result<(), DesktopError> {
        if text.is_empty() {
            return Ok(());
        }

        match self.method {
            InputMethod::Direct => self.type_direct(text),
            InputMethod::Clipboard => match self.type_via_clipboard(text) {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!("clipboard typing failed ({}), typing directly", e);
                    self.type_direct(text)
                }
            },
        }
    }

    /// Hold every key but the last, click the last, release in reverse
    pub fn send_hotkey(&mut self, keys: &[Key]) -> Result<(), DesktopError> {
        let Some((&last, modifiers)) = keys.split_last() else {
            return Ok(());
        };

        for modifier in modifiers {
            self.enigo
                .key(to_enigo(*modifier), Direction::Press)
                .map_err(|e| DesktopError::Keyboard(format!("failed to press modifier: {}", e)))?;
        }

        if !modifiers.is_empty() {
            thread::sleep(Duration::from_millis(10));
        }

        self.enigo
            .key(to_enigo(last), Direction::Click)
            .map_err(|e| DesktopError::Keyboard(format!("failed to click key: {}", e)))?;

        if !modifiers.is_empty() {
            thread::sleep(Duration::from_millis(50));
        }

        for modifier in modifiers.iter().rev() {
            self.enigo
                .key(to_enigo(*modifier), Direction::Release)
                .map_err(|e| DesktopError::Keyboard(format!("failed to release modifier: {}", e)))?;
        }

        Ok(())
    }

    fn type_via_clipboard(&mut self, text: &str) -> Result<(), DesktopError> {
        let mut clipboard = Clipboard::new()
            .map_err(|e| DesktopError::Clipboard(format!("failed to open clipboard: {}", e)))?;
        let previous = clipboard.get_text().ok();

        clipboard
            .set_text(text)
            .map_err(|e| DesktopError::Clipboard(format!("failed to set clipboard: {}", e)))?;
        thread::sleep(Duration::from_millis(50));

        let pasted = self.send_hotkey(&[Key::command_modifier(), Key::Char('v')]);
        if pasted.is_ok() {
            thread::sleep(Duration::from_millis(100));
        }

        // best effort
        if let Some(previous) = previous {
            let _ = clipboard.set_text(previous);
        }
        pasted
    }

    fn type_direct(&mut self, text: &str) -> Result<(), DesktopError> {
        self.enigo
            .text(text)
            .map_err(|e| DesktopError::Keyboard(format!("failed to type text: {}", e)))
    }
}
