use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub typing: TypingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            editor: EditorConfig::default(),
            speech: SpeechConfig::default(),
            recognizer: RecognizerConfig::default(),
            learning: LearningConfig::default(),
            typing: TypingConfig::default(),
        }
    }
}

fn default_name() -> String {
    "Pika".into()
}

// ============================================================================
// Editor Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// Name used in spoken replies ("Notepad is not open.")
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Process name checked for running / terminated
    #[serde(default = "default_process")]
    pub process: String,
    /// Program started by "open notepad"
    #[serde(default = "default_launch")]
    pub launch: String,
    /// Window title fragment focused when no target is named
    #[serde(default)]
    pub window: Option<String>,
    /// Directory holding `<target>.txt` notes for the read action
    #[serde(default = "default_notes_dir")]
    pub notes_dir: String,
    #[serde(default = "default_note")]
    pub default_note: String,
    /// Pause after launching before focusing the new window
    #[serde(default = "default_launch_wait")]
    pub launch_wait_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            process: default_process(),
            launch: default_launch(),
            window: None,
            notes_dir: default_notes_dir(),
            default_note: default_note(),
            launch_wait_ms: default_launch_wait(),
        }
    }
}

impl EditorConfig {
    /// Window title focused for the default target
    pub fn window_title(&self) -> &str {
        self.window.as_deref().unwrap_or(&self.display_name)
    }

    pub fn note_path(&self, target: &str) -> PathBuf {
        Path::new(&self.notes_dir).join(format!("{}.txt", target))
    }

    /// Names the classifier accepts for "open ..." / "close ..."
    pub fn aliases(&self) -> Vec<String> {
        let mut names = vec![
            "notepad".to_string(),
            "editor".to_string(),
            self.display_name.to_lowercase(),
        ];
        let process = Path::new(&self.process)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase());
        names.extend(process);
        names
    }
}

fn default_display_name() -> String {
    "Notepad".into()
}

fn default_process() -> String {
    if cfg!(target_os = "windows") {
        "notepad.exe".into()
    } else if cfg!(target_os = "macos") {
        "TextEdit".into()
    } else {
        "gedit".into()
    }
}

fn default_launch() -> String {
    if cfg!(target_os = "windows") {
        "notepad.exe".into()
    } else if cfg!(target_os = "macos") {
        "/System/Applications/TextEdit.app/Contents/MacOS/TextEdit".into()
    } else {
        "gedit".into()
    }
}

fn default_notes_dir() -> String {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pika")
        .to_string_lossy()
        .into_owned()
}

fn default_note() -> String {
    "notes".into()
}

fn default_launch_wait() -> u64 {
    1000
}

// ============================================================================
// Speech Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    /// espeak / espeak-ng subprocess (default)
    #[default]
    Espeak,
    /// Print replies only
    Console,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub engine: SpeechEngine,
    #[serde(default = "default_speech_program")]
    pub program: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngine::default(),
            program: default_speech_program(),
            voice: None,
            timeout_secs: default_speech_timeout(),
        }
    }
}

fn default_speech_program() -> String {
    "espeak-ng".into()
}

fn default_speech_timeout() -> u64 {
    30
}

// ============================================================================
// Recognizer Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    /// Typed lines on stdin (default)
    #[default]
    Console,
    /// External transcriber; its stdout is the utterance
    Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    #[serde(default)]
    pub backend: RecognizerBackend,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_recognizer_timeout")]
    pub timeout_secs: u64,
    /// Pause before capturing again after the service was unreachable
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::default(),
            program: String::new(),
            args: Vec::new(),
            timeout_secs: default_recognizer_timeout(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_recognizer_timeout() -> u64 {
    15
}

fn default_retry_delay() -> u64 {
    1000
}

// ============================================================================
// Learning Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LearningConfig {
    /// Defaults to `<data_dir>/pika/learning.json`
    #[serde(default)]
    pub state_path: Option<String>,
    #[serde(default = "default_true")]
    pub auto_adapt_rate: bool,
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            auto_adapt_rate: true,
            persist: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Typing Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    /// Native keystrokes
    #[default]
    Direct,
    /// Copy to clipboard, then paste with Cmd/Ctrl+V
    Clipboard,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypingConfig {
    #[serde(default)]
    pub input_method: InputMethod,
}

/// Expand ${VAR} to environment variable values and a leading ~ to the
/// home directory
fn expand_path(s: &str) -> String {
    let mut result = s.to_string();

    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_else(|_| {
                warn!("environment variable '{}' not found", var_name);
                String::new()
            });
            result.replace_range(start..start + end + 1, &value);
        } else {
            break;
        }
    }

    if result == "~" || result.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            result.replace_range(..1, &home.to_string_lossy());
        }
    }

    result
}

impl Config {
    /// `--config` if given, else `pika.toml` here, else the user config dir
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = [
            Some(PathBuf::from("pika.toml")),
            dirs::config_dir().map(|d| d.join("pika").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return match Self::from_file(&path) {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        warn!("{:#}; using defaults", e);
                        Ok(Self::default())
                    }
                };
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.resolve_paths();
        Ok(config)
    }

    fn resolve_paths(&mut self) {
        self.editor.notes_dir = expand_path(&self.editor.notes_dir);
        self.editor.launch = expand_path(&self.editor.launch);
        self.recognizer.program = expand_path(&self.recognizer.program);
        if let Some(path) = self.learning.state_path.as_mut() {
            *path = expand_path(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.name, "Pika");
        assert_eq!(config.editor.display_name, "Notepad");
        assert_eq!(config.editor.default_note, "notes");
        assert_eq!(config.editor.launch_wait_ms, 1000);
        assert_eq!(config.speech.engine, SpeechEngine::Espeak);
        assert_eq!(config.speech.timeout_secs, 30);
        assert_eq!(config.recognizer.backend, RecognizerBackend::Console);
        assert_eq!(config.recognizer.timeout_secs, 15);
        assert!(config.learning.auto_adapt_rate);
        assert!(config.learning.persist);
        assert_eq!(config.typing.input_method, InputMethod::Direct);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [editor]
            display_name = "Gedit"
            process = "gedit"

            [speech]
            engine = "console"

            [recognizer]
            backend = "command"
            program = "whisper-once"
            args = ["--model", "base"]

            [typing]
            input_method = "clipboard"
            "#,
        )
        .unwrap();
        assert_eq!(config.editor.display_name, "Gedit");
        assert_eq!(config.editor.window_title(), "Gedit");
        assert_eq!(config.speech.engine, SpeechEngine::Console);
        assert_eq!(config.speech.program, "espeak-ng");
        assert_eq!(config.recognizer.backend, RecognizerBackend::Command);
        assert_eq!(config.recognizer.args, vec!["--model", "base"]);
        assert_eq!(config.typing.input_method, InputMethod::Clipboard);
    }

    #[test]
    fn test_unknown_engine_is_an_error() {
        assert!(Config::parse("[speech]\nengine = \"festival\"").is_err());
    }

    #[test]
    fn test_env_expansion() {
        // SAFETY: test-only variable with a unique name
        unsafe { std::env::set_var("PIKA_TEST_NOTES", "/tmp/pika-notes") };
        let config = Config::parse("[editor]\nnotes_dir = \"${PIKA_TEST_NOTES}/inbox\"").unwrap();
        assert_eq!(config.editor.notes_dir, "/tmp/pika-notes/inbox");
        assert_eq!(
            config.editor.note_path("todo"),
            PathBuf::from("/tmp/pika-notes/inbox/todo.txt")
        );
    }

    #[test]
    fn test_home_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = Config::parse("[learning]\nstate_path = \"~/pika.json\"").unwrap();
        assert_eq!(
            config.learning.state_path.map(PathBuf::from),
            Some(home.join("pika.json"))
        );
    }

    #[test]
    fn test_aliases_include_display_and_process() {
        let mut editor = EditorConfig::default();
        editor.display_name = "Gedit".into();
        editor.process = "/usr/bin/gnome-text-editor".into();
        let aliases = editor.aliases();
        assert!(aliases.contains(&"gedit".to_string()));
        assert!(aliases.contains(&"gnome-text-editor".to_string()));
        assert!(aliases.contains(&"notepad".to_string()));
    }
}
