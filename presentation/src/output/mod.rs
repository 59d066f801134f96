//! Output formatting for routed steps and session summaries

pub mod console;
pub mod formatter;
