//! Action schema: the data contract a reasoning step conforms to.
//!
//! - [`Action`] - closed tagged union of the four agent actions
//! - [`Step`] - the envelope wrapping exactly one action
//! - [`validate`] - bounds, enum membership and completion invariants

pub mod action;
pub mod step;
pub mod validation;

pub use action::{Action, ActionTag, Clarification, Confidence, Report, ResearchPlan, WebSearch};
pub use step::Step;
pub use validation::{ValidationError, Violation, validate};
