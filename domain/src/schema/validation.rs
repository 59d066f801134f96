//! Step validation.
//!
//! Validation runs only on finalized steps, never on partial decodes. All
//! violations are collected so a single error explains everything wrong
//! with a step.

use super::action::{Action, ActionTag};
use super::step::Step;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const REASONING_STEPS: RangeInclusive<usize> = 2..=4;
pub const REMAINING_STEPS: RangeInclusive<usize> = 1..=3;
pub const UNCLEAR_TERMS: RangeInclusive<usize> = 1..=5;
pub const ASSUMPTIONS: RangeInclusive<usize> = 2..=4;
pub const QUESTIONS: RangeInclusive<usize> = 3..=5;
pub const PLANNED_STEPS: RangeInclusive<usize> = 3..=4;
pub const SEARCH_STRATEGIES: RangeInclusive<usize> = 2..=3;
pub const MAX_RESULTS: RangeInclusive<u32> = 1..=15;
pub const REPORT_MIN_WORDS: usize = 800;

/// A single broken schema rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    LengthOutOfBounds {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
    MaxResultsOutOfRange {
        value: u32,
    },
    ReportTooShort {
        words: usize,
        min: usize,
    },
    MissingCitations,
    UnknownConfidence {
        value: String,
    },
    CompletedWithoutReport {
        tag: ActionTag,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LengthOutOfBounds {
                field,
                len,
                min,
                max,
            } => write!(f, "{field} has {len} items (expected {min}..={max})"),
            Violation::MaxResultsOutOfRange { value } => write!(
                f,
                "max_results is {value} (expected {}..={})",
                MAX_RESULTS.start(),
                MAX_RESULTS.end()
            ),
            Violation::ReportTooShort { words, min } => {
                write!(f, "report content has {words} words (expected at least {min})")
            }
            Violation::MissingCitations => write!(f, "report content has no citation markers"),
            Violation::UnknownConfidence { value } => {
                write!(f, "confidence '{value}' is not one of high, medium, low")
            }
            Violation::CompletedWithoutReport { tag } => {
                write!(f, "task_completed is set on a {tag} action")
            }
        }
    }
}

/// A syntactically complete step that breaks schema invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid step: {}", join_violations(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a finalized step against the schema.
pub fn validate(step: &Step) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    check_len(&mut violations, "reasoning_steps", step.reasoning_steps.len(), REASONING_STEPS);
    check_len(&mut violations, "remaining_steps", step.remaining_steps.len(), REMAINING_STEPS);

    match &step.action {
        Action::Clarify(c) => {
            check_len(&mut violations, "unclear_terms", c.unclear_terms.len(), UNCLEAR_TERMS);
            check_len(&mut violations, "assumptions", c.assumptions.len(), ASSUMPTIONS);
            check_len(&mut violations, "questions", c.questions.len(), QUESTIONS);
        }
        Action::Plan(p) => {
            check_len(&mut violations, "planned_steps", p.planned_steps.len(), PLANNED_STEPS);
            check_len(
                &mut violations,
                "search_strategies",
                p.search_strategies.len(),
                SEARCH_STRATEGIES,
            );
        }
        Action::Search(s) => {
            if !MAX_RESULTS.contains(&s.max_results) {
                violations.push(Violation::MaxResultsOutOfRange {
                    value: s.max_results,
                });
            }
        }
        Action::Report(r) => {
            let words = r.word_count();
            if words < REPORT_MIN_WORDS {
                violations.push(Violation::ReportTooShort {
                    words,
                    min: REPORT_MIN_WORDS,
                });
            }
            if r.citations().is_empty() {
                violations.push(Violation::MissingCitations);
            }
            if !r.confidence.is_recognized() {
                violations.push(Violation::UnknownConfidence {
                    value: r.confidence.as_str().to_string(),
                });
            }
        }
    }

    if step.task_completed && step.action.tag() != ActionTag::Report {
        violations.push(Violation::CompletedWithoutReport {
            tag: step.action.tag(),
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn check_len(
    violations: &mut Vec<Violation>,
    field: &'static str,
    len: usize,
    bounds: RangeInclusive<usize>,
) {
    if !bounds.contains(&len) {
        violations.push(Violation::LengthOutOfBounds {
            field,
            len,
            min: *bounds.start(),
            max: *bounds.end(),
        });
    }
}
