//! Session - the capture, classify, dispatch, record, save loop
//!
//! One utterance is handled completely before the next capture starts:
//! 1. Advisory: announce a confident prediction from past utterances
//! 2. Dispatch the classified intent
//! 3. Record the turn in the learning state
//! 4. Implicit speech-rate adaptation
//! 5. Save the learning state
//!
//! The learning state is owned by the caller and passed into every turn.

use crate::command::{Action, Classifier, Intent, LearnRequest, describe_tag};
use crate::config::{Config, EditorConfig};
use crate::desktop::{Desktop, Key};
use crate::learning::adapt::{
    adaptation_help, apply_adaptation, apply_preference_statement, auto_adapt_rate, Reply,
};
use crate::learning::matcher::{predict_where, suggestion_pool};
use crate::learning::{LearningState, ResponseStyle, StateStore};
use crate::listen::{Ears, Heard};
use crate::voice::Voice;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Spoken when a window or file needed by an action is missing
pub fn not_open_message(target: &str) -> String {
    format!("{} is not open.", target)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    End,
}

/// What happened in one turn
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub utterance: String,
    pub action: Action,
    pub flow: Flow,
    /// "I think you want to ..." if one was spoken
    pub advisory: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub name: String,
    pub editor: EditorConfig,
    pub auto_adapt_rate: bool,
    pub retry_delay: Duration,
    /// Print every spoken line and every heard utterance
    pub echo: bool,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            editor: config.editor.clone(),
            auto_adapt_rate: config.learning.auto_adapt_rate,
            retry_delay: Duration::from_millis(config.recognizer.retry_delay_ms),
            echo: true,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Session<'a> {
    options: SessionOptions,
    classifier: Classifier,
    ears: &'a mut dyn Ears,
    voice: &'a mut dyn Voice,
    desktop: &'a mut dyn Desktop,
    store: &'a mut dyn StateStore,
}

impl<'a> Session<'a> {
    pub fn new(
        options: SessionOptions,
        ears: &'a mut dyn Ears,
        voice: &'a mut dyn Voice,
        desktop: &'a mut dyn Desktop,
        store: &'a mut dyn StateStore,
    ) -> Self {
        let classifier = Classifier::new(options.editor.aliases());
        Self {
            options,
            classifier,
            ears,
            voice,
            desktop,
            store,
        }
    }

    /// Greet, then handle utterances until an exit phrase or the end of
    /// input. Returns the number of turns handled.
    pub fn run(&mut self, state: &mut LearningState) -> usize {
        let name = self.options.name.clone();
        self.say(state, &format!("{} is ready to assist you.", name));
        self.say(state, "How can I help you today?");

        let mut turns = 0;
        loop {
            match self.ears.capture() {
                Heard::Text(utterance) => {
                    turns += 1;
                    if self.handle(state, &utterance).flow == Flow::End {
                        break;
                    }
                }
                Heard::Nothing => debug!("nothing recognized, listening again"),
                Heard::Unavailable(reason) => {
                    warn!("speech recognition unavailable: {}", reason);
                    self.say(
                        state,
                        "I can't reach the speech recognizer right now. I'll keep trying.",
                    );
                    thread::sleep(self.options.retry_delay);
                }
                Heard::Closed => {
                    info!("input closed, ending session");
                    break;
                }
            }
        }
        turns
    }

    /// Handle one recognized utterance
    #[hotpath::measure]
    pub fn handle(&mut self, state: &mut LearningState, utterance: &str) -> Turn {
        if self.options.echo {
            println!("You said: {}", utterance);
        }

        let advisory = self.advise(state, utterance);

        let intent = self.classifier.classify(utterance);
        let action = intent.action();
        let flow = self.dispatch(state, intent);

        state.record(utterance, action.tag());

        if self.options.auto_adapt_rate {
            let rate = state.user_preferences.speech_rate;
            let adapted = auto_adapt_rate(&state.command_history, rate);
            if adapted != rate {
                info!(from = rate, to = adapted, "adapted speech rate");
                state.user_preferences.speech_rate = adapted;
            }
        }

        if let Err(e) = self.store.save(state) {
            error!("could not save learning state: {}", e);
        }

        Turn {
            utterance: utterance.to_string(),
            action,
            flow,
            advisory,
        }
    }

    /// Announce a confident prediction. Dispatch still follows the rules,
    /// so the announced and performed actions may differ.
    fn advise(&mut self, state: &LearningState, utterance: &str) -> Option<String> {
        let prediction = predict_where(utterance, &state.command_patterns, |action| {
            action != Action::Unknown.tag()
        });
        let action = prediction.action?;
        let threshold = state.user_preferences.command_sensitivity.advisory_threshold();
        if prediction.confidence <= threshold {
            return None;
        }
        let advisory = format!("I think you want to {}.", describe_tag(&action));
        self.say(state, &advisory);
        Some(advisory)
    }

    fn say(&mut self, state: &LearningState, text: &str) {
        if self.options.echo {
            println!("{}: {}", self.options.name, text);
        }
        self.voice.speak(text, state.user_preferences.speech_rate);
    }

    fn reply(&mut self, state: &LearningState, reply: Reply) {
        let text = reply.render(state.user_preferences.response_style);
        self.say(state, &text);
    }

    fn not_open(&mut self, state: &LearningState, target: &str) {
        info!(window = target, "target not found");
        self.say(state, &not_open_message(target));
    }

    fn dispatch(&mut self, state: &mut LearningState, intent: Intent) -> Flow {
        match intent {
            Intent::Exit => {
                self.say(state, "Goodbye! Have a nice day.");
                return Flow::End;
            }
            Intent::InsertText { content, target } => {
                self.insert_text(state, content.as_deref(), target.as_deref())
            }
            Intent::ReadNotes { target } => self.read_notes(state, target.as_deref()),
            Intent::CloseEditor => self.close_editor(state),
            Intent::DeleteWord { target } => self.delete_word(state, target.as_deref()),
            Intent::ClearText { target } => self.clear_text(state, target.as_deref()),
            Intent::OpenEditor => self.open_editor(state),
            Intent::Greeting => self.greet(state),
            Intent::Learn(request) => self.learn(state, request),
            Intent::Adapt(command) => {
                let response = apply_adaptation(&command, &mut state.user_preferences);
                self.say(state, &response);
            }
            Intent::Unknown(utterance) => self.unknown(state, &utterance),
        }
        Flow::Continue
    }

    /// Focus `target`, or the editor window for the default target
    fn focus(&mut self, state: &LearningState, target: Option<&str>) -> bool {
        if self.desktop.focus_window(target) {
            return true;
        }
        let name = target.unwrap_or(self.options.editor.display_name.as_str()).to_string();
        self.not_open(state, &name);
        false
    }

    /// Start the editor when it is not running. False if it could not be
    /// started.
    fn ensure_editor(&mut self, state: &LearningState) -> bool {
        let editor = &self.options.editor;
        if self.desktop.is_process_running(&editor.process) {
            return true;
        }
        let launch = editor.launch.clone();
        let wait = Duration::from_millis(editor.launch_wait_ms);
        if self.desktop.launch_process(&launch) {
            thread::sleep(wait);
            true
        } else {
            let display = self.options.editor.display_name.clone();
            self.say(state, &format!("I could not open {}.", display));
            false
        }
    }

    fn keyboard_failed(&mut self, state: &LearningState, e: impl std::fmt::Display) {
        warn!("keyboard input failed: {}", e);
        self.say(state, "I could not reach the keyboard.");
    }

    fn insert_text(&mut self, state: &LearningState, content: Option<&str>, target: Option<&str>) {
        let Some(content) = content else {
            self.reply(
                state,
                Reply::new(
                    "Please tell me what to write using the command 'Write this: your text'.",
                )
                .brief("Say 'write this' followed by your text."),
            );
            return;
        };

        if target.is_none() && !self.ensure_editor(state) {
            return;
        }
        if !self.focus(state, target) {
            return;
        }

        let place = target.unwrap_or(self.options.editor.display_name.as_str()).to_string();
        match self.desktop.type_text(content) {
            Ok(()) => self.reply(
                state,
                Reply::new(format!("I have written: {}", content))
                    .brief("Done.")
                    .detail(format!("into {}.", place)),
            ),
            Err(e) => self.keyboard_failed(state, e),
        }
    }

    fn read_notes(&mut self, state: &LearningState, target: Option<&str>) {
        let name = target.unwrap_or(self.options.editor.default_note.as_str()).to_string();
        let path = self.options.editor.note_path(&name);
        debug!(path = %path.display(), "reading notes");

        match self.desktop.read_file(&path) {
            None => {
                info!(note = %name, "notes not found");
                self.say(state, &format!("I could not find any notes in {}.", name));
            }
            Some(text) if text.trim().is_empty() => {
                self.say(state, &format!("{} is empty.", name));
            }
            Some(text) => {
                self.say(state, &format!("Here is the text in {}:", name));
                self.say(state, text.trim());
            }
        }
    }

    fn close_editor(&mut self, state: &LearningState) {
        let process = self.options.editor.process.clone();
        let display = self.options.editor.display_name.clone();
        if !self.desktop.is_process_running(&process) {
            self.not_open(state, &display);
            return;
        }
        if self.desktop.terminate_process(&process) {
            self.reply(
                state,
                Reply::new(format!("I have closed {}.", display)).brief("Closed."),
            );
        } else {
            self.say(state, &format!("I could not close {}.", display));
        }
    }

    fn delete_word(&mut self, state: &LearningState, target: Option<&str>) {
        if !self.focus(state, target) {
            return;
        }
        match self.desktop.send_hotkey(&Key::delete_word()) {
            Ok(()) => self.reply(
                state,
                Reply::new("I deleted the last word.").brief("Deleted."),
            ),
            Err(e) => self.keyboard_failed(state, e),
        }
    }

    fn clear_text(&mut self, state: &LearningState, target: Option<&str>) {
        if !self.focus(state, target) {
            return;
        }
        let place = target.unwrap_or(self.options.editor.display_name.as_str()).to_string();
        let cleared = self
            .desktop
            .send_hotkey(&Key::select_all())
            .and_then(|()| self.desktop.send_hotkey(&[Key::Backspace]));
        match cleared {
            Ok(()) => self.reply(
                state,
                Reply::new(format!("I cleared all the text in {}.", place)).brief("Cleared."),
            ),
            Err(e) => self.keyboard_failed(state, e),
        }
    }

    fn open_editor(&mut self, state: &LearningState) {
        let editor = self.options.editor.clone();
        if self.desktop.is_process_running(&editor.process) {
            self.desktop.focus_window(None);
            self.reply(
                state,
                Reply::new(format!("{} is already open.", editor.display_name))
                    .brief("Already open."),
            );
        } else if self.desktop.launch_process(&editor.launch) {
            self.reply(
                state,
                Reply::new(format!("I have opened {} for you.", editor.display_name))
                    .brief("Opened."),
            );
        } else {
            self.say(state, &format!("I could not open {}.", editor.display_name));
        }
    }

    fn greet(&mut self, state: &LearningState) {
        let name = self.options.name.clone();
        self.say(
            state,
            &format!("Hello! I am {}, your voice assistant.", name),
        );
        if state.user_preferences.response_style != ResponseStyle::Brief {
            if let Some(hint) = state.suggest() {
                self.say(state, &hint);
            }
        }
    }

    fn learn(&mut self, state: &mut LearningState, request: LearnRequest) {
        match request {
            LearnRequest::Teach {
                phrase,
                action: Some(action),
                ..
            } => {
                state
                    .command_patterns
                    .entry_or_default(action.tag())
                    .push(phrase.clone());
                self.reply(
                    state,
                    Reply::new(format!(
                        "Got it. When you say '{}', I will know you want to {}.",
                        phrase,
                        action.describe()
                    ))
                    .brief("Got it."),
                );
            }
            LearnRequest::Teach { meaning, .. } => {
                debug!(meaning = %meaning, "refused to learn meaning");
                self.say(
                    state,
                    &format!(
                        "I can't learn '{}'. I can only learn new phrases for editor commands.",
                        meaning
                    ),
                );
            }
            LearnRequest::Preferences(statement) => {
                let response =
                    match apply_preference_statement(&statement, &mut state.user_preferences) {
                        Some(response) => response,
                        None => adaptation_help(&state.user_preferences),
                    };
                self.say(state, &response);
            }
            LearnRequest::Report => {
                let report = learning_report(state);
                self.reply(state, report);
            }
            LearnRequest::Forget => {
                state.forget();
                self.reply(
                    state,
                    Reply::new("I have forgotten everything I learned. Your preferences are kept.")
                        .brief("Forgotten."),
                );
            }
        }
    }

    fn unknown(&mut self, state: &LearningState, utterance: &str) {
        let suggestion = suggestion_pool(utterance, &state.command_patterns, |action| {
            action != Action::Unknown.tag()
        })
        .map(describe_tag);

        match suggestion {
            Some(action) => self.say(
                state,
                &format!("I'm not sure what you mean. Did you want to {}?", action),
            ),
            None => {
                let display = self.options.editor.display_name.clone();
                self.say(state, &generic_help(&display));
            }
        }
    }
}

/// Reply when nothing matched and nothing similar was heard before
pub fn generic_help(editor: &str) -> String {
    format!(
        "I'm not sure how to help with that. You can ask me to write text, read your notes, or open {}.",
        editor
    )
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}

/// Summary of what has been learned so far
pub fn learning_report(state: &LearningState) -> Reply {
    let remembered = state.pattern_count();
    let Some(top) = state.most_used_action() else {
        return Reply::new(format!(
            "I haven't learned anything yet. Current settings: {}.",
            state.user_preferences.describe()
        ))
        .brief("Nothing learned yet.");
    };
    let actions = state.command_patterns.len();
    Reply::new(format!(
        "I remember {} {} for {} different {}. You most often ask me to {}.",
        remembered,
        plural(remembered, "command"),
        actions,
        plural(actions, "action"),
        describe_tag(top)
    ))
    .brief(format!("I remember {} {}.", remembered, plural(remembered, "command")))
    .detail(format!(
        "Current settings: {}.",
        state.user_preferences.describe()
    ))
}
