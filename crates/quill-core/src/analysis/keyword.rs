//! Built-in heuristic analyzer based on keyword and style rules

use super::{AnalysisReport, TextAnalyzer};
use crate::error::Result;
use async_trait::async_trait;

const TOXIC_KEYWORDS: &[&str] = &[
    "idiot", "stupid", "hate", "trash", "useless", "scam", "fraud", "kill", "violence", "jerk",
];

const SPAM_TRIGGERS: &[&str] = &[
    "buy now",
    "call now",
    "limited offer",
    "work from home",
    "earn money fast",
    "visit my site",
    "click here",
    "crypto investment",
    "100% free",
    "guaranteed profit",
];

const PROMOTION_WORDS: &[&str] = &["discount", "offer", "limited", "deal", "prize"];

/// Characters above which a comment counts as very long
const VERY_LONG_CHARS: usize = 800;

/// Keyword analyzer
///
/// Deterministic and offline. Each rule that fires adds a fixed weight to one
/// of the two scores and records a tag naming the rule.
#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score text synchronously
    pub fn score(&self, text: &str) -> AnalysisReport {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return AnalysisReport::new(0.0, 0.0).with_language("und");
        }

        let lower = trimmed.to_lowercase();
        let mut tags: Vec<String> = Vec::new();
        let mut toxicity = 0.0;
        let mut spam = 0.0;

        for keyword in TOXIC_KEYWORDS {
            if lower.contains(keyword) {
                toxicity += 0.25;
                tags.push(format!("keyword:{}", keyword));
            }
        }

        if has_shouting_token(trimmed) {
            toxicity += 0.1;
            tags.push("style:shouting".to_string());
        }

        if has_repeated_run(trimmed, 6) {
            toxicity += 0.1;
            tags.push("style:repetition".to_string());
        }

        for phrase in SPAM_TRIGGERS {
            if lower.contains(phrase) {
                spam += 0.25;
                tags.push(format!("phrase:{}", phrase));
            }
        }

        let links = count_links(&lower);
        if links > 0 {
            spam += (0.3 + 0.05 * (links - 1) as f64).min(0.7);
            tags.push("links".to_string());
        } else if lower.contains("http://") || lower.contains("https://") || lower.contains("www.") {
            spam += 0.2;
            tags.push("links:pattern".to_string());
        }

        let uppercase_words = trimmed
            .split_whitespace()
            .filter(|w| {
                w.chars().count() >= 5
                    && w.chars().any(|c| c.is_ascii_uppercase())
                    && *w == w.to_uppercase()
            })
            .count();
        if uppercase_words >= 3 {
            toxicity += 0.1;
            tags.push("style:uppercase".to_string());
        }

        if trimmed.chars().count() > VERY_LONG_CHARS {
            spam += 0.2;
            tags.push("length:very_long".to_string());
        }

        if PROMOTION_WORDS.iter().any(|w| lower.contains(w)) {
            spam += 0.15;
            tags.push("keywords:promotion".to_string());
        }

        let mut unique = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        AnalysisReport::new(round_score(toxicity), round_score(spam))
            .with_tags(unique)
            .with_language(detect_language(trimmed))
    }
}

#[async_trait]
impl TextAnalyzer for KeywordAnalyzer {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn analyze(&self, text: &str, _language_hint: Option<&str>) -> Result<AnalysisReport> {
        Ok(self.score(text))
    }
}

/// Clamp to `[0, 1]` and round to two decimals
fn round_score(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// An all-caps ASCII token of four or more letters
fn has_shouting_token(text: &str) -> bool {
    text.split_whitespace()
        .any(|w| w.len() >= 4 && w.chars().all(|c| c.is_ascii_uppercase()))
}

fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut length = 0;
    for ch in text.chars() {
        if ch == '\n' {
            previous = None;
            length = 0;
            continue;
        }
        if Some(ch) == previous {
            length += 1;
        } else {
            previous = Some(ch);
            length = 1;
        }
        if length >= run {
            return true;
        }
    }
    false
}

/// Count `http://` and `https://` links followed by at least one non-space character
fn count_links(lower: &str) -> usize {
    let mut count = 0;
    let mut rest = lower;
    while let Some(pos) = rest.find("http") {
        let after = &rest[pos + 4..];
        let scheme_end = if after.starts_with("s://") {
            Some(4)
        } else if after.starts_with("://") {
            Some(3)
        } else {
            None
        };
        match scheme_end {
            Some(len) => {
                let tail = &after[len..];
                if tail.chars().next().map_or(false, |c| !c.is_whitespace()) {
                    count += 1;
                }
                rest = tail;
            }
            None => rest = after,
        }
    }
    count
}

/// Best-effort language code from script ranges and greeting words
pub fn detect_language(text: &str) -> &'static str {
    if text.trim().is_empty() {
        return "und";
    }
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        return "hi";
    }
    if text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        return "ru";
    }

    let lower = text.to_lowercase();
    let table: &[(&str, &[&str])] = &[
        ("es", &["gracias", "hola", "por favor", "buenos dias"]),
        ("de", &["danke", "hallo", "bitte", "guten tag"]),
        ("pt", &["ola", "obrigado", "por favor", "bom dia"]),
        ("hi", &["namaste", "dhanyavad"]),
    ];
    for (code, words) in table {
        if words.iter().any(|w| contains_word(&lower, w)) {
            return *code;
        }
    }
    "en"
}

/// Whether `phrase` occurs in `haystack` with no word character on either side
fn contains_word(haystack: &str, phrase: &str) -> bool {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    haystack.match_indices(phrase).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + phrase.len()..].chars().next();
        !before.map_or(false, is_word) && !after.map_or(false, is_word)
    })
}
