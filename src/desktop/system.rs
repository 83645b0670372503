//! Desktop backed by the running system
//!
//! Window focus goes through `wmctrl` (falling back to `xdotool`) on Linux
//! and `osascript` on macOS. Processes are looked up with sysinfo.

#[cfg(feature = "typing")]
use super::input::KeyboardInput;
use super::{Desktop, DesktopError, Key};
use crate::config::InputMethod;
use crate::exec;
use std::fs;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use sysinfo::{Process, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

const FOCUS_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SystemDesktop {
    /// Title fragment of the editor window, focused for the default target
    default_window: String,
    system: System,
    /// Programs we launched, reaped once they exit
    children: Vec<Child>,
    #[cfg_attr(not(feature = "typing"), allow(dead_code))]
    input_method: InputMethod,
    #[cfg(feature = "typing")]
    keyboard: Option<KeyboardInput>,
}

impl SystemDesktop {
    pub fn new(default_window: impl Into<String>, input_method: InputMethod) -> Self {
        Self {
            default_window: default_window.into(),
            system: System::new(),
            children: Vec::new(),
            input_method,
            #[cfg(feature = "typing")]
            keyboard: None,
        }
    }

    /// Created on first use so that sessions which never type work headless
    #[cfg(feature = "typing")]
    fn keyboard(&mut self) -> Result<&mut KeyboardInput, DesktopError> {
        if self.keyboard.is_none() {
            self.keyboard = Some(KeyboardInput::new(self.input_method)?);
        }
        self.keyboard
            .as_mut()
            .ok_or(DesktopError::Unsupported("keyboard unavailable"))
    }

    /// Wait on launched programs that have exited
    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), %status, "launched program exited");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid = child.id(), "cannot check launched program: {}", e);
                false
            }
        });
    }

    fn refresh(&mut self) {
        self.reap();
        self.system.refresh_processes(ProcessesToUpdate::All, true);
    }

    fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Process> + 'a {
        self.system
            .processes()
            .values()
            .filter(move |p| process_matches(&p.name().to_string_lossy(), name))
    }
}

/// Case-insensitive name match that ignores a trailing ".exe" on either side
fn process_matches(actual: &str, wanted: &str) -> bool {
    let strip = |s: &str| {
        let lower = s.to_lowercase();
        lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
    };
    let wanted = Path::new(wanted)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| wanted.to_string());
    strip(actual) == strip(&wanted)
}

#[cfg(target_os = "linux")]
fn focus(title: &str) -> bool {
    if exec::succeeds(Command::new("wmctrl").arg("-a").arg(title), FOCUS_TIMEOUT) {
        return true;
    }
    exec::succeeds(
        Command::new("xdotool")
            .args(["search", "--name", title, "windowactivate"]),
        FOCUS_TIMEOUT,
    )
}

#[cfg(target_os = "macos")]
fn focus(title: &str) -> bool {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    let script = format!(
        "tell application \"System Events\"\n\
         set matches to (every process whose name contains \"{0}\" or (exists (first window whose name contains \"{0}\")))\n\
         if matches is {{}} then error \"no window\"\n\
         set frontmost of item 1 of matches to true\n\
         end tell",
        escaped
    );
    exec::succeeds(Command::new("osascript").arg("-e").arg(script), FOCUS_TIMEOUT)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn focus(_title: &str) -> bool {
    warn!("window focus is not supported on this platform");
    false
}

impl Desktop for SystemDesktop {
    fn focus_window(&mut self, target: Option<&str>) -> bool {
        let title = target.unwrap_or(&self.default_window).to_string();
        let found = focus(&title);
        debug!(window = %title, found, "focus");
        found
    }

    #[cfg(feature = "typing")]
    fn type_text(&mut self, text: &str) -> Result<(), DesktopError> {
        self.keyboard()?.type_text(text)
    }

    #[cfg(not(feature = "typing"))]
    fn type_text(&mut self, _text: &str) -> Result<(), DesktopError> {
        Err(DesktopError::Unsupported("built without the typing feature"))
    }

    #[cfg(feature = "typing")]
    fn send_hotkey(&mut self, keys: &[Key]) -> Result<(), DesktopError> {
        self.keyboard()?.send_hotkey(keys)
    }

    #[cfg(not(feature = "typing"))]
    fn send_hotkey(&mut self, _keys: &[Key]) -> Result<(), DesktopError> {
        Err(DesktopError::Unsupported("built without the typing feature"))
    }

    fn is_process_running(&mut self, name: &str) -> bool {
        self.refresh();
        self.matching(name).next().is_some()
    }

    fn launch_process(&mut self, program: &str) -> bool {
        let mut parts = program.split_whitespace();
        let Some(binary) = parts.next() else {
            return false;
        };
        match Command::new(binary)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!(program, pid = child.id(), "launched");
                self.reap();
                self.children.push(child);
                true
            }
            Err(e) => {
                warn!("cannot launch {}: {}", program, e);
                false
            }
        }
    }

    fn terminate_process(&mut self, name: &str) -> bool {
        self.refresh();
        let mut killed = 0;
        for process in self.matching(name) {
            if process.kill() {
                killed += 1;
            }
        }
        debug!(name, killed, "terminate");
        killed > 0
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }
}
