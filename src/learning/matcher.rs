//! Pattern matching against previously heard utterances

use super::PatternTable;
use crate::fuzzy::similarity;

/// Minimum confidence for a prediction
pub const PREDICTION_THRESHOLD: f64 = 0.6;
/// Minimum score for a remembered utterance to join the suggestion pool
pub const SUGGESTION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub action: Option<String>,
    pub confidence: f64,
}

impl Prediction {
    pub fn none() -> Self {
        Self {
            action: None,
            confidence: 0.0,
        }
    }
}

/// Best-scoring remembered utterance, if its score exceeds
/// [`PREDICTION_THRESHOLD`]. Scores compare lowercased text; the first
/// pair in insertion order wins ties.
pub fn predict(utterance: &str, patterns: &PatternTable) -> Prediction {
    predict_where(utterance, patterns, |_| true)
}

/// [`predict`] over the actions accepted by `eligible` only
#[hotpath::measure]
pub fn predict_where(
    utterance: &str,
    patterns: &PatternTable,
    eligible: impl Fn(&str) -> bool,
) -> Prediction {
    let utterance = utterance.to_lowercase();
    let mut best: Option<(&str, f64)> = None;

    for (action, remembered) in patterns.iter() {
        if !eligible(action) {
            continue;
        }
        for previous in remembered {
            let score = similarity(&utterance, &previous.to_lowercase());
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((action, score));
            }
        }
    }

    match best {
        Some((action, confidence)) if confidence > PREDICTION_THRESHOLD => Prediction {
            action: Some(action.to_string()),
            confidence,
        },
        _ => Prediction::none(),
    }
}

/// Most frequent action among all remembered utterances scoring above
/// [`SUGGESTION_THRESHOLD`]. Every qualifying utterance counts once for its
/// action; the action seen first wins ties. Actions rejected by `eligible`
/// are left out of the pool.
pub fn suggestion_pool<'a>(
    utterance: &str,
    patterns: &'a PatternTable,
    eligible: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    let utterance = utterance.to_lowercase();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for (action, remembered) in patterns.iter() {
        if !eligible(action) {
            continue;
        }
        let hits = remembered
            .iter()
            .filter(|previous| similarity(&utterance, &previous.to_lowercase()) > SUGGESTION_THRESHOLD)
            .count();
        if hits > 0 {
            counts.push((action, hits));
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (action, hits) in counts {
        if best.is_none_or(|(_, top)| hits > top) {
            best = Some((action, hits));
        }
    }
    best.map(|(action, _)| action)
}
