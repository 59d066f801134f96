//! Action tag detection.
//!
//! A tag is recognised by the token signature `"tool" : "<wire name>"`,
//! matched on exact keys so that neither string contents nor longer keys
//! can trigger it. A buffer with no action signature but an envelope key
//! yields the generic envelope fallback.

use super::lexer::Token;
use crate::schema::ActionTag;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TAG_KEY: &str = "tool";
pub const ENVELOPE_KEY: &str = "reasoning_steps";

/// Best-known variant of the step being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedTag {
    Action(ActionTag),
    /// Only the step envelope has been seen so far.
    Envelope,
}

impl DetectedTag {
    pub fn is_specific(&self) -> bool {
        matches!(self, DetectedTag::Action(_))
    }

    pub fn action(&self) -> Option<ActionTag> {
        match self {
            DetectedTag::Action(tag) => Some(*tag),
            DetectedTag::Envelope => None,
        }
    }

    /// Merge a newer detection into the current one.
    ///
    /// A specific tag is sticky; only the envelope fallback (or nothing)
    /// can be replaced.
    pub(crate) fn settle(current: Option<DetectedTag>, newer: Option<DetectedTag>) -> Option<DetectedTag> {
        match (current, newer) {
            (Some(DetectedTag::Action(tag)), _) => Some(DetectedTag::Action(tag)),
            (_, Some(newer)) => Some(newer),
            (current, None) => current,
        }
    }
}

impl fmt::Display for DetectedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectedTag::Action(tag) => write!(f, "{}", tag),
            DetectedTag::Envelope => write!(f, "step"),
        }
    }
}

/// Conflicting action signatures within one buffer.
///
/// Resolved locally by priority order and kept only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeAmbiguity {
    pub candidates: Vec<ActionTag>,
    pub chosen: ActionTag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TagScan {
    pub tag: Option<DetectedTag>,
    pub ambiguity: Option<DecodeAmbiguity>,
}

pub(crate) fn scan(tokens: &[Token]) -> TagScan {
    let mut candidates: Vec<ActionTag> = Vec::new();
    let mut envelope = false;

    for (i, window) in tokens.windows(2).enumerate() {
        let [Token::Str(key), Token::Colon] = window else {
            continue;
        };
        if key == ENVELOPE_KEY {
            envelope = true;
        } else if key == TAG_KEY
            && let Some(Token::Str(value)) = tokens.get(i + 2)
            && let Some(tag) = ActionTag::from_wire(value)
            && !candidates.contains(&tag)
        {
            candidates.push(tag);
        }
    }

    candidates.sort_by_key(ActionTag::priority);
    match candidates.first().copied() {
        Some(chosen) => TagScan {
            tag: Some(DetectedTag::Action(chosen)),
            ambiguity: (candidates.len() > 1).then(|| DecodeAmbiguity {
                candidates: candidates.clone(),
                chosen,
            }),
        },
        None if envelope => TagScan {
            tag: Some(DetectedTag::Envelope),
            ambiguity: None,
        },
        None => TagScan::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::lexer::lex;

    fn scan_text(text: &str) -> TagScan {
        scan(&lex(text).tokens)
    }

    #[test]
    fn test_detects_action_tag() {
        let result = scan_text(r#"{"function":{"tool":"web_search","#);
        assert_eq!(result.tag, Some(DetectedTag::Action(ActionTag::Search)));
        assert!(result.ambiguity.is_none());
    }

    #[test]
    fn test_partial_tag_value_not_detected() {
        let result = scan_text(r#"{"function":{"tool":"web_sea"#);
        assert_eq!(result.tag, None);
    }

    #[test]
    fn test_envelope_fallback() {
        let result = scan_text(r#"{"reasoning_steps":["a"#);
        assert_eq!(result.tag, Some(DetectedTag::Envelope));
    }

    #[test]
    fn test_tag_name_inside_string_value_ignored() {
        let result = scan_text(r#"{"plan_status":"tool: web_search","current_situation":"tool","#);
        assert_eq!(result.tag, None);
    }

    #[test]
    fn test_tool_as_value_is_not_a_key() {
        let result = scan_text(r#"{"x":"tool","y":"create_report","#);
        assert_eq!(result.tag, None);
    }

    #[test]
    fn test_longer_key_does_not_match() {
        let result = scan_text(r#"{"toolbox":"web_search","#);
        assert_eq!(result.tag, None);
    }

    #[test]
    fn test_conflict_resolved_by_priority() {
        let result = scan_text(
            r#"{"function":{"tool":"create_report"},"alt":{"tool":"clarification"},"#,
        );
        assert_eq!(result.tag, Some(DetectedTag::Action(ActionTag::Clarify)));
        assert_eq!(
            result.ambiguity,
            Some(DecodeAmbiguity {
                candidates: vec![ActionTag::Clarify, ActionTag::Report],
                chosen: ActionTag::Clarify,
            })
        );
    }

    #[test]
    fn test_settle_keeps_specific_tag() {
        let search = Some(DetectedTag::Action(ActionTag::Search));
        let report = Some(DetectedTag::Action(ActionTag::Report));
        assert_eq!(DetectedTag::settle(search, report), search);
        assert_eq!(DetectedTag::settle(Some(DetectedTag::Envelope), report), report);
        assert_eq!(DetectedTag::settle(None, Some(DetectedTag::Envelope)), Some(DetectedTag::Envelope));
        assert_eq!(DetectedTag::settle(Some(DetectedTag::Envelope), None), Some(DetectedTag::Envelope));
    }
}
