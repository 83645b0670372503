//! Command classification - turns recognized text into an intent
//!
//! Rules are checked in order of priority and the first match wins:
//! 1. Exit phrases - end the session
//! 2. Note/insert/write - type text into the editor
//! 3. Read - read notes aloud
//! 4. Close editor
//! 5. Backspace / delete word
//! 6. Clear - clear all text
//! 7. Open editor
//! 8. Greeting
//! 9. Learn/remember - teach, set preferences, report, forget
//! 10. Adapt/adjust - change speech, responses or sensitivity
//! 11. Anything else is an unknown command
//!
//! Several rules can match the same utterance ("write read the notes"), so
//! the order above is part of the behavior.

use crate::fuzzy::{contains_phrase, similarity, words};
use crate::learning::matcher::PREDICTION_THRESHOLD;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Action tag recorded for every classified turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Exit,
    InsertText,
    ReadNotes,
    CloseEditor,
    DeleteWord,
    ClearText,
    OpenEditor,
    Greeting,
    TeachCommand,
    SetPreferences,
    ReportLearning,
    ForgetLearning,
    AdaptPreferences,
    Unknown,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::Exit,
        Action::InsertText,
        Action::ReadNotes,
        Action::CloseEditor,
        Action::DeleteWord,
        Action::ClearText,
        Action::OpenEditor,
        Action::Greeting,
        Action::TeachCommand,
        Action::SetPreferences,
        Action::ReportLearning,
        Action::ForgetLearning,
        Action::AdaptPreferences,
        Action::Unknown,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Action::Exit => "exit",
            Action::InsertText => "insert_text",
            Action::ReadNotes => "read_notes",
            Action::CloseEditor => "close_editor",
            Action::DeleteWord => "delete_word",
            Action::ClearText => "clear_text",
            Action::OpenEditor => "open_editor",
            Action::Greeting => "greeting",
            Action::TeachCommand => "teach_command",
            Action::SetPreferences => "set_preferences",
            Action::ReportLearning => "report_learning",
            Action::ForgetLearning => "forget_learning",
            Action::AdaptPreferences => "adapt_preferences",
            Action::Unknown => "unknown_command",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.tag() == tag)
    }

    /// Completes "you want to ..."
    pub fn describe(self) -> &'static str {
        match self {
            Action::Exit => "end our session",
            Action::InsertText => "write some text",
            Action::ReadNotes => "read your notes",
            Action::CloseEditor => "close the editor",
            Action::DeleteWord => "delete the last word",
            Action::ClearText => "clear all the text",
            Action::OpenEditor => "open the editor",
            Action::Greeting => "say hello",
            Action::TeachCommand => "teach me a new command",
            Action::SetPreferences => "set your preferences",
            Action::ReportLearning => "hear what I have learned",
            Action::ForgetLearning => "make me forget what I learned",
            Action::AdaptPreferences => "adjust my settings",
            Action::Unknown => "try something I don't know yet",
        }
    }

    /// Whether a taught phrase may stand for this action
    pub fn is_teachable(self) -> bool {
        matches!(
            self,
            Action::InsertText
                | Action::ReadNotes
                | Action::CloseEditor
                | Action::DeleteWord
                | Action::ClearText
                | Action::OpenEditor
                | Action::Greeting
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Human description of a stored action tag, including tags this build
/// does not know
pub fn describe_tag(tag: &str) -> String {
    match Action::from_tag(tag) {
        Some(action) => action.describe().to_string(),
        None => tag.replace('_', " "),
    }
}

/// What the learn/remember sub-classifier decided
#[derive(Debug, Clone, PartialEq)]
pub enum LearnRequest {
    /// `action` is `None` when the meaning is not a teachable command
    Teach {
        phrase: String,
        meaning: String,
        action: Option<Action>,
    },
    Preferences(String),
    Report,
    Forget,
}

/// A classified utterance with whatever was extracted from it
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Exit,
    InsertText {
        content: Option<String>,
        target: Option<String>,
    },
    ReadNotes {
        target: Option<String>,
    },
    CloseEditor,
    DeleteWord {
        target: Option<String>,
    },
    ClearText {
        target: Option<String>,
    },
    OpenEditor,
    Greeting,
    Learn(LearnRequest),
    Adapt(String),
    Unknown(String),
}

impl Intent {
    pub fn action(&self) -> Action {
        match self {
            Intent::Exit => Action::Exit,
            Intent::InsertText { .. } => Action::InsertText,
            Intent::ReadNotes { .. } => Action::ReadNotes,
            Intent::CloseEditor => Action::CloseEditor,
            Intent::DeleteWord { .. } => Action::DeleteWord,
            Intent::ClearText { .. } => Action::ClearText,
            Intent::OpenEditor => Action::OpenEditor,
            Intent::Greeting => Action::Greeting,
            Intent::Learn(LearnRequest::Teach { .. }) => Action::TeachCommand,
            Intent::Learn(LearnRequest::Preferences(_)) => Action::SetPreferences,
            Intent::Learn(LearnRequest::Report) => Action::ReportLearning,
            Intent::Learn(LearnRequest::Forget) => Action::ForgetLearning,
            Intent::Adapt(_) => Action::AdaptPreferences,
            Intent::Unknown(_) => Action::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RuleKind {
    Exit,
    Insert,
    Read,
    Close,
    DeleteWord,
    Clear,
    Open,
    Greeting,
    Learn,
    Adapt,
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// Any of these phrases, as whole words
    Words(&'static [&'static str]),
    /// The verb plus a name of the editor
    Editor(&'static str),
}

struct Rule {
    kind: RuleKind,
    trigger: Trigger,
}

/// Priority-ordered rule table
const RULES: [Rule; 10] = [
    Rule {
        kind: RuleKind::Exit,
        trigger: Trigger::Words(&["exit", "quit", "goodbye", "good bye"]),
    },
    Rule {
        kind: RuleKind::Insert,
        trigger: Trigger::Words(&["note", "insert", "write", "right"]),
    },
    Rule {
        kind: RuleKind::Read,
        trigger: Trigger::Words(&["read"]),
    },
    Rule {
        kind: RuleKind::Close,
        trigger: Trigger::Editor("close"),
    },
    Rule {
        kind: RuleKind::DeleteWord,
        trigger: Trigger::Words(&["backspace", "back word", "delete word"]),
    },
    Rule {
        kind: RuleKind::Clear,
        trigger: Trigger::Words(&["clear"]),
    },
    Rule {
        kind: RuleKind::Open,
        trigger: Trigger::Editor("open"),
    },
    Rule {
        kind: RuleKind::Greeting,
        trigger: Trigger::Words(&["hello", "hi", "hey"]),
    },
    Rule {
        kind: RuleKind::Learn,
        trigger: Trigger::Words(&["learn", "learned", "learning", "remember", "teach"]),
    },
    Rule {
        kind: RuleKind::Adapt,
        trigger: Trigger::Words(&["adapt", "adjust"]),
    },
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

/// `<verb> "<content>" to <target>`
static QUOTED_INSERT: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?i)\b(?:note|insert|write|right)\b(?:\s+this)?\s*:?\s*["“]([^"”]+)["”]\s+(?:to|in|into)\s+(.+?)[\s.!?]*$"#,
    )
});

/// Everything after the insert keyword
static INSERT_REMAINDER: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:note|insert|write|right)\b(?:\s+this)?\s*:?\s*(.*)$")
});

static READ_TARGET: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\bread\b.*?\s(?:in|from)\s+(.+?)[\s.!?]*$"));

static DELETE_WORD_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:backspace|back\s+word|delete\s+word)\b.*?\s(?:in|from)\s+(.+?)[\s.!?]*$")
});

static CLEAR_TARGET: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\bclear\b.*?\s(?:in|from)\s+(.+?)[\s.!?]*$"));

/// "when I say X do Y"
static TEACH_WHEN: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?i)\bwhen\s+i\s+say\s+["“]?(.+?)["”]?\s*,?\s+(?:i\s+mean|that\s+means|it\s+means|means|you\s+should|do)\s+["“]?(.+?)["”]?[\s.!?]*$"#,
    )
});

/// "learn that X means Y"
static TEACH_MEANS: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?i)\b(?:learn|remember|teach\s+me)\s+(?:that\s+)?["“]?(.+?)["”]?\s+means\s+["“]?(.+?)["”]?[\s.!?]*$"#,
    )
});

/// Trim a captured target and drop a leading article
fn clean_target(raw: &str) -> Option<String> {
    let target = raw.trim().trim_matches(|c| c == '"' || c == '“' || c == '”');
    let target = target
        .strip_prefix("the ")
        .or_else(|| target.strip_prefix("The "))
        .unwrap_or(target)
        .trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

fn capture_target(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| clean_target(m.as_str()))
}

/// Content and target of an insert command.
///
/// The quoted form yields both; otherwise everything after the keyword is
/// the content and the target is left to the default.
pub fn extract_insert(text: &str) -> (Option<String>, Option<String>) {
    if let Some(captures) = QUOTED_INSERT.captures(text) {
        let content = captures.get(1).map(|m| m.as_str().trim().to_string());
        let target = captures.get(2).and_then(|m| clean_target(m.as_str()));
        return (content.filter(|c| !c.is_empty()), target);
    }

    debug!("no quoted content in {:?}, taking the rest of the sentence", text);
    let content = INSERT_REMAINDER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .trim()
                .trim_matches(|c| c == '"' || c == '“' || c == '”')
                .trim()
                .to_string()
        })
        .filter(|c| !c.is_empty());
    (content, None)
}

/// Rule-based classifier
pub struct Classifier {
    /// Lowercased names the editor answers to ("notepad", "editor", ...)
    editor_names: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(["notepad", "editor"])
    }
}

impl Classifier {
    pub fn new<I, S>(editor_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in editor_names {
            let name = words(name.as_ref()).join(" ");
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            editor_names: names,
        }
    }

    fn triggers(&self, trigger: Trigger, words: &[String]) -> bool {
        match trigger {
            Trigger::Words(phrases) => phrases.iter().any(|p| contains_phrase(words, p)),
            Trigger::Editor(verb) => {
                contains_phrase(words, verb)
                    && self.editor_names.iter().any(|n| contains_phrase(words, n))
            }
        }
    }

    fn first_rule(&self, words: &[String]) -> Option<RuleKind> {
        RULES
            .iter()
            .find(|rule| self.triggers(rule.trigger, words))
            .map(|rule| rule.kind)
    }

    /// Classify one utterance. Always yields exactly one intent.
    #[hotpath::measure]
    pub fn classify(&self, utterance: &str) -> Intent {
        let text = utterance.trim();
        let words = words(text);

        let intent = match self.first_rule(&words) {
            Some(RuleKind::Exit) => Intent::Exit,
            Some(RuleKind::Insert) => {
                let (content, target) = extract_insert(text);
                Intent::InsertText { content, target }
            }
            Some(RuleKind::Read) => Intent::ReadNotes {
                target: capture_target(&READ_TARGET, text),
            },
            Some(RuleKind::Close) => Intent::CloseEditor,
            Some(RuleKind::DeleteWord) => Intent::DeleteWord {
                target: capture_target(&DELETE_WORD_TARGET, text),
            },
            Some(RuleKind::Clear) => Intent::ClearText {
                target: capture_target(&CLEAR_TARGET, text),
            },
            Some(RuleKind::Open) => Intent::OpenEditor,
            Some(RuleKind::Greeting) => Intent::Greeting,
            Some(RuleKind::Learn) => Intent::Learn(self.classify_learn(text, &words)),
            Some(RuleKind::Adapt) => Intent::Adapt(text.to_string()),
            None => Intent::Unknown(text.to_string()),
        };

        debug!(utterance = text, action = %intent.action(), "classified");
        intent
    }

    /// Sub-classifier for learn/remember phrases
    fn classify_learn(&self, text: &str, words: &[String]) -> LearnRequest {
        if contains_phrase(words, "forget") {
            return LearnRequest::Forget;
        }

        let taught = TEACH_WHEN
            .captures(text)
            .or_else(|| TEACH_MEANS.captures(text));
        if let Some(captures) = taught {
            let phrase = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let meaning = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if !phrase.is_empty() && !meaning.is_empty() {
                let action = self.resolve_meaning(meaning).filter(|a| a.is_teachable());
                return LearnRequest::Teach {
                    phrase: phrase.to_lowercase(),
                    meaning: meaning.to_string(),
                    action,
                };
            }
        }

        if ["prefer", "preference", "preferences"]
            .iter()
            .any(|w| contains_phrase(words, w))
        {
            return LearnRequest::Preferences(text.to_string());
        }

        LearnRequest::Report
    }

    /// Action a taught meaning stands for. Command phrases go through the
    /// rule table; anything else is matched against action names, so that
    /// "opening the editor" works where "open the editor" would have been
    /// claimed by an earlier rule.
    fn resolve_meaning(&self, meaning: &str) -> Option<Action> {
        let direct = self.classify(meaning).action();
        if direct != Action::Unknown {
            return Some(direct);
        }

        let meaning = meaning.to_lowercase();
        let mut best: Option<(Action, f64)> = None;
        for action in Action::ALL {
            if action == Action::Unknown {
                continue;
            }
            let score = similarity(&meaning, action.describe())
                .max(similarity(&meaning, &action.tag().replace('_', " ")));
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((action, score));
            }
        }
        best.filter(|&(_, score)| score > PREDICTION_THRESHOLD)
            .map(|(action, _)| action)
    }
}
