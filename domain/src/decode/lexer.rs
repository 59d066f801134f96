//! Truncation-tolerant JSON tokenizer.
//!
//! Scans a buffer that is expected to grow into a single JSON object.
//! Scanning starts at the first `{` and stops at whichever comes first:
//! the close of that object, an unterminated token at the tail, or the end
//! of the buffer. Anything after the top-level object is ignored.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Colon,
    Comma,
    /// A fully terminated, unescaped string.
    Str(String),
    /// A delimiter-terminated number, boolean or null.
    Scalar(Value),
    /// A terminated run of text that is not valid JSON.
    Invalid,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Lexed {
    pub tokens: Vec<Token>,
    /// Byte range of the top-level object once its closing brace is seen.
    pub document: Option<(usize, usize)>,
    /// Whether any `Invalid` token or mismatched closer was encountered.
    pub malformed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Object,
    Array,
}

pub(crate) fn lex(buffer: &str) -> Lexed {
    let mut lexed = Lexed::default();
    let Some(start) = buffer.find('{') else {
        return lexed;
    };

    let bytes = buffer.as_bytes();
    let mut stack: Vec<Open> = Vec::new();
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
            }
            b'{' | b'[' => {
                let (token, open) = if b == b'{' {
                    (Token::BeginObject, Open::Object)
                } else {
                    (Token::BeginArray, Open::Array)
                };
                lexed.tokens.push(token);
                stack.push(open);
                i += 1;
            }
            b'}' | b']' => {
                let (token, expected) = if b == b'}' {
                    (Token::EndObject, Open::Object)
                } else {
                    (Token::EndArray, Open::Array)
                };
                i += 1;
                if stack.last() == Some(&expected) {
                    stack.pop();
                    lexed.tokens.push(token);
                    if stack.is_empty() {
                        lexed.document = Some((start, i));
                        break;
                    }
                } else {
                    lexed.malformed = true;
                    lexed.tokens.push(Token::Invalid);
                }
            }
            b':' => {
                lexed.tokens.push(Token::Colon);
                i += 1;
            }
            b',' => {
                lexed.tokens.push(Token::Comma);
                i += 1;
            }
            b'"' => {
                let Some(end) = string_end(bytes, i) else {
                    break;
                };
                match serde_json::from_str::<String>(&buffer[i..end]) {
                    Ok(s) => lexed.tokens.push(Token::Str(s)),
                    Err(_) => {
                        lexed.malformed = true;
                        lexed.tokens.push(Token::Invalid);
                    }
                }
                i = end;
            }
            _ => {
                let end = scalar_end(bytes, i);
                if end == bytes.len() {
                    // The scalar may still be growing.
                    break;
                }
                match serde_json::from_str::<Value>(&buffer[i..end]) {
                    Ok(value) if !value.is_string() && !value.is_object() && !value.is_array() => {
                        lexed.tokens.push(Token::Scalar(value))
                    }
                    _ => {
                        lexed.malformed = true;
                        lexed.tokens.push(Token::Invalid);
                    }
                }
                i = end;
            }
        }
    }

    lexed
}

/// Index one past the closing quote of the string starting at `open`, or
/// `None` if the string is not yet terminated.
fn string_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn scalar_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | b',' | b':' | b'{' | b'}' | b'[' | b']' | b'"' => {
                return i;
            }
            _ => i += 1,
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(lexed: &Lexed) -> Vec<&str> {
        lexed
            .tokens
            .iter()
            .filter_map(|t| match t {
                Token::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_leading_text_is_skipped() {
        let lexed = lex("```json\n{\"a\":1}\n```");
        assert_eq!(
            lexed.tokens,
            vec![
                Token::BeginObject,
                Token::Str("a".to_string()),
                Token::Colon,
                Token::Scalar(Value::from(1)),
                Token::EndObject,
            ]
        );
        assert_eq!(lexed.document, Some((8, 15)));
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let lexed = lex(r#"{"q":"say \"hi\" now""#);
        assert_eq!(strings(&lexed), vec!["q", "say \"hi\" now"]);
        assert!(lexed.document.is_none());
    }

    #[test]
    fn test_unterminated_string_stops_scan() {
        let lexed = lex(r#"{"a":"done","b":"still go"#);
        assert_eq!(strings(&lexed), vec!["a", "done", "b"]);
        assert_eq!(lexed.tokens.last(), Some(&Token::Colon));
    }

    #[test]
    fn test_trailing_backslash_is_unterminated() {
        let lexed = lex(r#"{"a":"x\"#);
        assert_eq!(strings(&lexed), vec!["a"]);
    }

    #[test]
    fn test_scalar_at_tail_is_withheld() {
        let lexed = lex(r#"{"n":12"#);
        assert_eq!(lexed.tokens.last(), Some(&Token::Colon));

        let lexed = lex(r#"{"n":12,"#);
        assert!(lexed.tokens.contains(&Token::Scalar(Value::from(12))));
    }

    #[test]
    fn test_booleans_and_null() {
        let lexed = lex(r#"{"a":true,"b":false,"c":null}"#);
        assert!(lexed.tokens.contains(&Token::Scalar(Value::Bool(true))));
        assert!(lexed.tokens.contains(&Token::Scalar(Value::Bool(false))));
        assert!(lexed.tokens.contains(&Token::Scalar(Value::Null)));
        assert!(!lexed.malformed);
    }

    #[test]
    fn test_bare_word_is_invalid() {
        let lexed = lex(r#"{"a":maybe}"#);
        assert!(lexed.malformed);
        assert!(lexed.tokens.contains(&Token::Invalid));
        assert!(lexed.document.is_some());
    }

    #[test]
    fn test_mismatched_closer_is_invalid() {
        let lexed = lex(r#"{"a":[1,2}"#);
        assert!(lexed.malformed);
        assert!(lexed.document.is_none());
    }

    #[test]
    fn test_trailing_text_after_document_ignored() {
        let lexed = lex(r#"{"a":1} {"b":2}"#);
        assert_eq!(lexed.document, Some((0, 7)));
        assert_eq!(lexed.tokens.len(), 5);
    }

    #[test]
    fn test_unicode_escape_decoded() {
        let lexed = lex(r#"{"a":"\u00e9t\u00e9"}"#);
        assert_eq!(strings(&lexed), vec!["a", "été"]);
    }
}
