//! Incremental step decoder.
//!
//! [`IncrementalDecoder`] consumes a monotonically growing buffer and emits
//! a [`DecodeEvent`] per call:
//!
//! - `Partial` while the top-level object is still open, carrying every
//!   field whose value is fully terminated
//! - `Complete` once the object closes, parses and validates
//! - `Error` when a complete buffer cannot become a valid step, or when the
//!   stream ends or fails first
//!
//! Known fields accumulate across feeds with last-write-wins per field and
//! are never dropped by a later feed.

use super::lexer::lex;
use super::partial::{FieldView, reconstruct};
use super::tag::{DecodeAmbiguity, DetectedTag, scan};
use crate::schema::Step;
use crate::schema::ValidationError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why the upstream stream stopped before a step completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out waiting for the next chunk")]
    TimedOut,

    #[error("Operation cancelled")]
    Cancelled,
}

/// Terminal decode failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeFailure {
    /// The buffer closed syntactically but does not parse as a step.
    #[error("malformed step document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The stream ended while the document was still open.
    #[error("stream ended before the step document was complete")]
    Incomplete,

    #[error(transparent)]
    Stream(#[from] StreamFailure),
}

impl DecodeFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecodeFailure::Stream(StreamFailure::Cancelled))
    }
}

/// Fields extracted so far from the step under construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnownFields {
    /// Terminated envelope members. The action sub-document appears here
    /// (under `function`) only once it is balanced.
    pub envelope: BTreeMap<String, Value>,
    /// Terminated members of the action sub-document, available while it
    /// is still open.
    pub action: BTreeMap<String, Value>,
    /// Complete elements of arrays that have not closed yet, keyed by
    /// `field` (envelope) or `function.field` (action).
    pub growing: BTreeMap<String, Vec<Value>>,
}

impl KnownFields {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.envelope.get(field)
    }

    pub fn action_field(&self, field: &str) -> Option<&Value> {
        self.action.get(field)
    }

    pub fn growing(&self, field: &str) -> Option<&[Value]> {
        self.growing.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.envelope.is_empty() && self.action.is_empty() && self.growing.is_empty()
    }

    /// Clarification questions seen so far, complete or still streaming.
    pub fn questions(&self) -> Vec<String> {
        let closed = self.action.get("questions").and_then(Value::as_array);
        let values: &[Value] = match closed {
            Some(values) => values,
            None => self.growing("function.questions").unwrap_or(&[]),
        };
        values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    fn absorb(&mut self, envelope: FieldView, action: FieldView) {
        self.envelope.extend(envelope.fields);
        self.action.extend(action.fields);

        // Growing arrays are a live view: replaced on every feed, and
        // dropped once the array itself is known.
        self.growing.clear();
        for (key, items) in envelope.growing {
            if !self.envelope.contains_key(&key) {
                self.growing.insert(key, items);
            }
        }
        for (key, items) in action.growing {
            if !self.action.contains_key(&key) {
                self.growing.insert(format!("function.{key}"), items);
            }
        }
    }
}

/// Outcome of feeding the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    Partial {
        known_fields: KnownFields,
        detected_tag: Option<DetectedTag>,
    },
    Complete {
        step: Step,
    },
    Error {
        reason: DecodeFailure,
        raw_text: String,
    },
}

impl DecodeEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecodeEvent::Partial { .. })
    }
}

/// Decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Run schema validation on completed steps.
    pub schema_validation: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            schema_validation: true,
        }
    }
}

/// Mutable state of one in-flight step.
#[derive(Debug, Clone, Default)]
pub struct DecodeState {
    raw: String,
    detected_tag: Option<DetectedTag>,
    known: KnownFields,
    ambiguity: Option<DecodeAmbiguity>,
    complete: bool,
    feeds: usize,
}

impl DecodeState {
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn detected_tag(&self) -> Option<DetectedTag> {
        self.detected_tag
    }

    pub fn known_fields(&self) -> &KnownFields {
        &self.known
    }

    /// The last tag conflict seen, if any.
    pub fn ambiguity(&self) -> Option<&DecodeAmbiguity> {
        self.ambiguity.as_ref()
    }

    /// Whether the buffer has reached a syntactically complete document.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn feed_count(&self) -> usize {
        self.feeds
    }
}

/// Decoder for one step at a time; call [`reset`](Self::reset) between
/// steps.
#[derive(Debug, Clone, Default)]
pub struct IncrementalDecoder {
    options: DecoderOptions,
    state: DecodeState,
}

impl IncrementalDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            state: DecodeState::default(),
        }
    }

    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.options.schema_validation = enabled;
        self
    }

    pub fn state(&self) -> &DecodeState {
        &self.state
    }

    /// Decode the whole buffer received so far.
    pub fn feed(&mut self, buffer: &str) -> DecodeEvent {
        self.absorb(buffer.to_string())
    }

    /// Append a chunk to the owned buffer and decode it.
    pub fn push(&mut self, chunk: &str) -> DecodeEvent {
        let mut buffer = std::mem::take(&mut self.state.raw);
        buffer.push_str(chunk);
        self.absorb(buffer)
    }

    /// The producer signalled that no more text will arrive.
    pub fn finish(&mut self) -> DecodeEvent {
        if self.state.complete {
            let buffer = self.state.raw.clone();
            return self.absorb(buffer);
        }
        DecodeEvent::Error {
            reason: DecodeFailure::Incomplete,
            raw_text: self.state.raw.clone(),
        }
    }

    /// The producer failed; the step can no longer complete.
    pub fn fail(&mut self, failure: StreamFailure) -> DecodeEvent {
        DecodeEvent::Error {
            reason: DecodeFailure::Stream(failure),
            raw_text: self.state.raw.clone(),
        }
    }

    /// Discard the current state to start a new step.
    pub fn reset(&mut self) {
        self.state = DecodeState::default();
    }

    fn absorb(&mut self, buffer: String) -> DecodeEvent {
        let lexed = lex(&buffer);
        let tags = scan(&lexed.tokens);
        let partial = reconstruct(&lexed.tokens);

        let state = &mut self.state;
        state.feeds += 1;
        state.detected_tag = DetectedTag::settle(state.detected_tag, tags.tag);
        if tags.ambiguity.is_some() {
            state.ambiguity = tags.ambiguity;
        }
        state.known.absorb(partial.envelope, partial.action);
        state.complete = lexed.document.is_some();
        state.raw = buffer;

        let Some((start, end)) = lexed.document else {
            return DecodeEvent::Partial {
                known_fields: state.known.clone(),
                detected_tag: state.detected_tag,
            };
        };

        let step = match serde_json::from_str::<Step>(&state.raw[start..end]) {
            Ok(step) => step,
            Err(e) => {
                return DecodeEvent::Error {
                    reason: DecodeFailure::Malformed(e.to_string()),
                    raw_text: state.raw.clone(),
                };
            }
        };

        if self.options.schema_validation
            && let Err(e) = step.validate()
        {
            return DecodeEvent::Error {
                reason: DecodeFailure::Invalid(e),
                raw_text: state.raw.clone(),
            };
        }

        DecodeEvent::Complete { step }
    }
}
