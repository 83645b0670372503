//! String matching utilities
//!
//! Provides the longest-matching-block similarity used to compare a new
//! utterance with previously heard ones, and word-level phrase matching used
//! by the command rules to avoid substring accidents ("read" in "thread").

/// Similarity ratio in `[0, 1]`: `2 * matched / (len(a) + len(b))`.
///
/// Matched characters are found by repeatedly taking the longest common
/// block and recursing on both sides of it. Arguments are put in a canonical
/// order first so that `similarity(a, b) == similarity(b, a)` always holds.
/// Two empty strings are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Total size of all matching blocks between `a` and `b`
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_match(a, b);
    if size == 0 {
        return 0;
    }
    size + matching_characters(&a[..i], &b[..j])
        + matching_characters(&a[i + size..], &b[j + size..])
}

/// Longest common contiguous block, as `(start_in_a, start_in_b, len)`.
/// Ties go to the earliest start in `a`, then the earliest start in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // prev[j + 1] = length of the common suffix ending at a[i - 1], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let len = curr[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Clean text for matching: lowercase and keep only letters, digits,
/// apostrophes and whitespace
pub fn clean_for_matching(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Lowercased words of `text`, punctuation removed
pub fn words(text: &str) -> Vec<String> {
    clean_for_matching(text)
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Whether `phrase` appears in `words` as a run of whole words
pub fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let wanted: Vec<&str> = phrase.split_whitespace().collect();
    if wanted.is_empty() || wanted.len() > words.len() {
        return false;
    }
    words
        .windows(wanted.len())
        .any(|window| window.iter().zip(&wanted).all(|(w, p)| w == p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(similarity("open notepad", "open notepad"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_disjoint_strings() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_known_ratios() {
        // "abcd" vs "bcde": block "bcd" -> 2 * 3 / 8
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        // blocks "a" and "c" -> 2 * 2 / 6
        assert!((similarity("abc", "axc") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_recurses_on_both_sides() {
        // longest block " notepad", then "open" on the left side
        let score = similarity("open notepad", "open the notepad");
        assert!((score - 2.0 * 12.0 / 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("clear the notes", "clean all notes"),
            ("write hello", "right hello"),
            ("abab", "baba"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{} / {}", a, b);
        }
    }

    #[test]
    fn test_clean_for_matching() {
        assert_eq!(clean_for_matching("Hello!"), "hello ");
        assert_eq!(clean_for_matching("Don't stop."), "don't stop ");
    }

    #[test]
    fn test_words() {
        assert_eq!(words("Write this: hello, world"), vec!["write", "this", "hello", "world"]);
    }

    #[test]
    fn test_contains_phrase_whole_words() {
        let w = words("please read the thread");
        assert!(contains_phrase(&w, "read"));
        assert!(contains_phrase(&w, "the thread"));
        assert!(!contains_phrase(&w, "rea"));
        assert!(!contains_phrase(&words("already done"), "read"));
        assert!(!contains_phrase(&w, ""));
    }
}
