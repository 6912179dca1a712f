//! Command-line interface for quizforge.
//!
//! Provides commands for question generation, template management, and
//! metrics inspection.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
