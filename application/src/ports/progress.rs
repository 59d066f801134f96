//! Progress notification port
//!
//! Defines the interface for rendering a research session while steps
//! stream in.

use crate::use_cases::run_session::{SessionError, SessionSnapshot, StepOutcome};
use sgr_domain::PhaseRecord;

/// Callback for progress updates during a research session
///
/// Implementations live in the presentation layer. Every method has a
/// no-op default so renderers only implement what they display.
pub trait SessionProgressNotifier: Send + Sync {
    /// Called when a new step starts streaming (1-based index).
    fn on_step_start(&self, _index: usize) {}

    /// Called with the live view of the streaming step, throttled by the
    /// session's render settings.
    fn on_partial(&self, _snapshot: &SessionSnapshot) {}

    /// Called when a step was decoded and routed.
    fn on_step_complete(&self, _outcome: &StepOutcome) {}

    /// Called when a step ended without a route.
    fn on_step_failed(&self, _error: &SessionError) {}

    /// Called when starting a phase implicitly closed a running one.
    fn on_phase_auto_closed(&self, _record: &PhaseRecord) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoSessionProgress;

impl SessionProgressNotifier for NoSessionProgress {}
