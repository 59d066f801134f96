//! Domain layer for sgr-stream
//!
//! This crate contains the schema-guided decode and routing core. It has no
//! dependencies on infrastructure, presentation or an async runtime.
//!
//! # Core Concepts
//!
//! ## Step and Action
//!
//! A research agent emits one [`Step`] per reasoning cycle. Each step wraps
//! exactly one [`Action`]: clarify, plan, search or report.
//!
//! ## Incremental decoding
//!
//! The [`IncrementalDecoder`] extracts fields from a step while it is still
//! streaming, detects which action is being produced, and finalizes the
//! step once the document closes.
//!
//! ## Routing
//!
//! The [`DecisionRouter`] maps a finalized action plus [`SessionCounters`]
//! to a [`RouteToken`] for the workflow host.

pub mod decode;
pub mod routing;
pub mod schema;
pub mod sources;
pub mod stream;
pub mod text;
pub mod tracking;

// Re-export commonly used types
pub use decode::{
    DecodeAmbiguity, DecodeEvent, DecodeFailure, DecodeState, DecoderOptions, DetectedTag,
    IncrementalDecoder, KnownFields, StreamFailure,
};
pub use routing::{
    DecisionRouter, Intent, IntentMarkers, RouteDecision, RouteReason, RouteToken,
    SessionCounters,
};
pub use schema::{
    Action, ActionTag, Clarification, Confidence, Report, ResearchPlan, Step, ValidationError,
    Violation, WebSearch, validate,
};
pub use sources::{Source, SourceRegistry};
pub use stream::{StreamChunk, StreamMetrics};
pub use tracking::{
    Clock, ManualClock, PhaseGroup, PhaseHandle, PhaseMetadata, PhaseRecord, PhaseStart,
    PhaseStatus, PhaseSummary, PhaseTracker, SystemClock,
};
