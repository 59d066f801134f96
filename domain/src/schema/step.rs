//! The step envelope.

use super::action::Action;
use super::validation::{ValidationError, validate};
use serde::{Deserialize, Serialize};

/// One unit of agent reasoning output: a trace plus exactly one [`Action`].
///
/// The action is carried under the `function` key (`action` is accepted on
/// input). Every other member is optional when parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub reasoning_steps: Vec<String>,
    #[serde(default)]
    pub current_situation: String,
    #[serde(default)]
    pub plan_status: String,
    #[serde(default)]
    pub searches_done: u32,
    #[serde(default)]
    pub enough_data: bool,
    #[serde(default)]
    pub remaining_steps: Vec<String>,
    #[serde(default)]
    pub task_completed: bool,
    #[serde(rename = "function", alias = "action")]
    pub action: Action,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            reasoning_steps: Vec::new(),
            current_situation: String::new(),
            plan_status: String::new(),
            searches_done: 0,
            enough_data: false,
            remaining_steps: Vec::new(),
            task_completed: false,
            action,
        }
    }

    pub fn with_reasoning_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasoning_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remaining_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remaining_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_situation(mut self, situation: impl Into<String>) -> Self {
        self.current_situation = situation.into();
        self
    }

    pub fn with_task_completed(mut self, completed: bool) -> Self {
        self.task_completed = completed;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }
}
