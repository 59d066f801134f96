//! Decision routing from decoded actions to the next workflow phase.

pub mod counters;
pub mod markers;
pub mod router;

pub use counters::SessionCounters;
pub use markers::{Intent, IntentMarkers};
pub use router::{DecisionRouter, RouteDecision, RouteReason, RouteToken};
