//! Excerpt derivation for posts authored without one

const SHORT_SUMMARY_CHARS: usize = 160;
const MAX_SUMMARY_CHARS: usize = 380;

/// Leading sentences of `content` as a plain-text excerpt.
///
/// Takes two sentences, or three when two are shorter than 160 characters,
/// and truncates with an ellipsis past 380 characters. `None` for blank text.
pub fn derive_excerpt(content: &str) -> Option<String> {
    let plain = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if plain.is_empty() {
        return None;
    }

    let sentences = split_sentences(&plain);
    let mut summary = sentences.iter().take(2).copied().collect::<Vec<_>>().join(" ");
    if summary.chars().count() < SHORT_SUMMARY_CHARS && sentences.len() > 2 {
        summary = sentences.iter().take(3).copied().collect::<Vec<_>>().join(" ");
    }

    if summary.chars().count() > MAX_SUMMARY_CHARS {
        let cut: String = summary.chars().take(MAX_SUMMARY_CHARS - 3).collect();
        summary = format!("{}...", cut.trim_end());
    }

    Some(summary)
}

/// Split whitespace-normalised text after `.`, `!` or `?` followed by a space
fn split_sentences(plain: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = plain.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if b == b' ' && i > 0 && matches!(bytes[i - 1], b'.' | b'!' | b'?') {
            sentences.push(&plain[start..i]);
            start = i + 1;
        }
    }
    if start < plain.len() {
        sentences.push(&plain[start..]);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content() {
        assert_eq!(derive_excerpt(""), None);
        assert_eq!(derive_excerpt(" \n\t"), None);
    }

    #[test]
    fn test_two_long_sentences() {
        let first = format!("{}.", "a".repeat(100));
        let second = format!("{}!", "b".repeat(100));
        let text = format!("{}  {}\n\nThird one?", first, second);
        assert_eq!(derive_excerpt(&text).unwrap(), format!("{} {}", first, second));
    }

    #[test]
    fn test_short_sentences_take_three() {
        let text = "Back up first. Then patch. Then reboot. Then relax.";
        assert_eq!(
            derive_excerpt(text).unwrap(),
            "Back up first. Then patch. Then reboot."
        );
    }

    #[test]
    fn test_truncation() {
        let text = format!("{}.", "word ".repeat(100));
        let excerpt = derive_excerpt(&text).unwrap();
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= 380);
    }
}
