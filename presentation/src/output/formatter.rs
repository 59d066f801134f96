//! Output formatter trait

use crate::cli::commands::OutputFormat;
use sgr_application::StepOutcome;

/// Trait for formatting routed steps
pub trait OutputFormatter {
    /// Format the step with its routing decision
    fn format(&self, outcome: &StepOutcome) -> String;

    /// Format as JSON
    fn format_json(&self, outcome: &StepOutcome) -> String;

    /// Format the routing token only (concise output)
    fn format_route(&self, outcome: &StepOutcome) -> String;

    /// Format according to the selected output format
    fn format_as(&self, format: OutputFormat, outcome: &StepOutcome) -> String {
        match format {
            OutputFormat::Full => self.format(outcome),
            OutputFormat::Routes => self.format_route(outcome),
            OutputFormat::Json => self.format_json(outcome),
        }
    }
}
