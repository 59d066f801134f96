//! Text helpers for previews of streamed content.

/// Cut `s` to at most `max_len` bytes, ending in `...` when shortened.
/// Never splits a UTF-8 character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// The last `max_chars` characters of `s` on a single line, prefixed with
/// `...` when shortened.
pub fn tail(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let count = flat.chars().count();
    if count <= max_chars {
        return flat;
    }
    let skip = count - max_chars.saturating_sub(3);
    format!("...{}", flat.chars().skip(skip).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
        // "é" is two bytes; the cut backs off to a boundary
        assert_eq!(truncate("ééééé", 8), "éé...");
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("line one\nline two", 10), "...ine two");
        assert_eq!(tail("日本語テキスト", 6), "...キスト");
    }
}
