//! Incremental decoding of streamed step documents.
//!
//! The pipeline per feed is: [`lexer`] tokenizes the buffer up to the first
//! unterminated token, [`partial`] rebuilds the open/closed document tree,
//! [`tag`] detects the action variant, and [`decoder`] merges the result
//! into the per-step [`DecodeState`].

pub mod decoder;
mod lexer;
mod partial;
pub mod tag;

pub use decoder::{
    DecodeEvent, DecodeFailure, DecodeState, DecoderOptions, IncrementalDecoder, KnownFields,
    StreamFailure,
};
pub use partial::{ACTION_KEY, ACTION_KEY_ALIAS};
pub use tag::{DecodeAmbiguity, DetectedTag};
