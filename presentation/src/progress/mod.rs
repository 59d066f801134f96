//! Live progress rendering while steps stream

pub mod reporter;
