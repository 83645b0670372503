//! Runtime preferences and how they adapt
//!
//! Preferences change in two ways: explicitly, when the user asks to adjust
//! speech, responses or sensitivity, and implicitly, when the recent history
//! shows the user keeps asking for repeats (slow down) or never does (speed
//! up).

use super::CommandRecord;
use crate::fuzzy::{contains_phrase, words};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_RATE: u32 = 80;
pub const MAX_RATE: u32 = 250;
pub const DEFAULT_RATE: u32 = 150;
/// Step for explicit faster/slower requests
pub const RATE_STEP: u32 = 20;

/// Records inspected by [`auto_adapt_rate`]
pub const AUTO_WINDOW: usize = 10;
const AUTO_REPEAT_LIMIT: usize = 3;
const AUTO_SLOWER_STEP: u32 = 10;
const AUTO_SLOWER_FLOOR: u32 = 100;
const AUTO_FASTER_STEP: u32 = 5;
const AUTO_FASTER_CEILING: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    Brief,
    #[default]
    Normal,
    Detailed,
}

impl fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStyle::Brief => write!(f, "brief"),
            ResponseStyle::Normal => write!(f, "normal"),
            ResponseStyle::Detailed => write!(f, "detailed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Normal,
    High,
}

impl Sensitivity {
    /// Prediction confidence above which the assistant announces its guess
    pub fn advisory_threshold(self) -> f64 {
        match self {
            Sensitivity::Low => 0.9,
            Sensitivity::Normal => 0.8,
            Sensitivity::High => 0.7,
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensitivity::Low => write!(f, "low"),
            Sensitivity::Normal => write!(f, "normal"),
            Sensitivity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_rate")]
    pub speech_rate: u32,
    #[serde(default)]
    pub response_style: ResponseStyle,
    #[serde(default)]
    pub command_sensitivity: Sensitivity,
}

fn default_rate() -> u32 {
    DEFAULT_RATE
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            speech_rate: DEFAULT_RATE,
            response_style: ResponseStyle::default(),
            command_sensitivity: Sensitivity::default(),
        }
    }
}

impl Preferences {
    /// Clamp values loaded from an edited or older document
    pub fn sanitize(&mut self) {
        self.speech_rate = self.speech_rate.clamp(MIN_RATE, MAX_RATE);
    }

    pub fn describe(&self) -> String {
        format!(
            "speech rate {}, {} responses, {} sensitivity",
            self.speech_rate, self.response_style, self.command_sensitivity
        )
    }
}

/// A spoken reply with optional short and extended forms
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    normal: String,
    brief: Option<String>,
    detail: Option<String>,
}

impl Reply {
    pub fn new(normal: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            brief: None,
            detail: None,
        }
    }

    pub fn brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn render(&self, style: ResponseStyle) -> String {
        match (style, &self.brief, &self.detail) {
            (ResponseStyle::Brief, Some(brief), _) => brief.clone(),
            (ResponseStyle::Detailed, _, Some(detail)) => format!("{} {}", self.normal, detail),
            _ => self.normal.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dimension {
    Rate,
    Style,
    Sensitivity,
}

impl Dimension {
    const ALL: [Dimension; 3] = [Dimension::Rate, Dimension::Style, Dimension::Sensitivity];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Dimension::Rate => &["speech", "voice"],
            Dimension::Style => &["response", "responses", "answers"],
            Dimension::Sensitivity => &["sensitivity"],
        }
    }

    fn mentioned(self, words: &[String]) -> bool {
        self.keywords().iter().any(|k| contains_phrase(words, k))
    }

    /// Apply the direction found in `words`, returning what changed
    fn adjust(self, words: &[String], prefs: &mut Preferences) -> Option<String> {
        let has = |w: &str| contains_phrase(words, w);
        match self {
            Dimension::Rate => {
                let rate = prefs.speech_rate;
                prefs.speech_rate = if has("faster") {
                    (rate + RATE_STEP).min(MAX_RATE)
                } else if has("slower") {
                    rate.saturating_sub(RATE_STEP).max(MIN_RATE)
                } else if has("normal") {
                    DEFAULT_RATE
                } else {
                    return None;
                };
                Some(format!("speech rate is now {}", prefs.speech_rate))
            }
            Dimension::Style => {
                prefs.response_style = if has("detailed") {
                    ResponseStyle::Detailed
                } else if has("brief") {
                    ResponseStyle::Brief
                } else if has("normal") {
                    ResponseStyle::Normal
                } else {
                    return None;
                };
                Some(format!("responses are now {}", prefs.response_style))
            }
            Dimension::Sensitivity => {
                prefs.command_sensitivity = if has("high") {
                    Sensitivity::High
                } else if has("low") {
                    Sensitivity::Low
                } else if has("normal") {
                    Sensitivity::Normal
                } else {
                    return None;
                };
                Some(format!(
                    "command sensitivity is now {}",
                    prefs.command_sensitivity
                ))
            }
        }
    }
}

/// Help text naming the current values and what can be said
pub fn adaptation_help(prefs: &Preferences) -> String {
    format!(
        "I can adjust speech or voice (faster, slower, normal), responses or answers \
         (brief, normal, detailed), and sensitivity (high, low, normal). \
         Right now: {}.",
        prefs.describe()
    )
}

/// Handle an explicit "adapt ..." / "adjust ..." request.
///
/// The first dimension mentioned (speech, then responses, then sensitivity)
/// is adjusted. A missing dimension or direction answers with help; this
/// never fails.
pub fn apply_adaptation(command: &str, prefs: &mut Preferences) -> String {
    let words = words(command);
    let Some(dimension) = Dimension::ALL.into_iter().find(|d| d.mentioned(&words)) else {
        return adaptation_help(prefs);
    };
    match dimension.adjust(&words, prefs) {
        Some(change) => format!("Done, {}.", change),
        None => adaptation_help(prefs),
    }
}

/// Apply every dimension mentioned with a direction, for statements like
/// "remember I prefer brief answers and slower speech". `None` if nothing
/// applied.
pub fn apply_preference_statement(command: &str, prefs: &mut Preferences) -> Option<String> {
    let words = words(command);
    let changes: Vec<String> = Dimension::ALL
        .into_iter()
        .filter(|d| d.mentioned(&words))
        .filter_map(|d| d.adjust(&words, prefs))
        .collect();
    if changes.is_empty() {
        None
    } else {
        Some(format!("I'll remember that: {}.", changes.join(" and ")))
    }
}

/// Whether an utterance asks for a repeat
pub fn asks_for_repeat(command: &str) -> bool {
    words(command).iter().any(|w| w == "repeat")
}

/// Implicit rate adaptation from the last [`AUTO_WINDOW`] records.
///
/// More than three repeat requests slow speech by 10 (not below 100); none
/// speeds it up by 5 (not above 200). A rate already beyond a bound is left
/// alone rather than pulled back.
pub fn auto_adapt_rate(history: &[CommandRecord], current: u32) -> u32 {
    let recent = &history[history.len().saturating_sub(AUTO_WINDOW)..];
    let repeats = recent.iter().filter(|r| asks_for_repeat(&r.command)).count();

    if repeats > AUTO_REPEAT_LIMIT {
        if current > AUTO_SLOWER_FLOOR {
            return current.saturating_sub(AUTO_SLOWER_STEP).max(AUTO_SLOWER_FLOOR);
        }
    } else if repeats == 0 && current < AUTO_FASTER_CEILING {
        return (current + AUTO_FASTER_STEP).min(AUTO_FASTER_CEILING);
    }
    current
}
