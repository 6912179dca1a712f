//! quizforge: Adaptive question-generation pipeline for curriculum learning.
//!
//! This library turns curriculum-aligned generation requests into validated,
//! pedagogically-sound questions: request intake and deduplication, a job
//! queue with a bounded worker pool, template selection with exclusion
//! tracking, a validate-or-regenerate control loop, a TTL result cache, and
//! pollable job status.

// Core modules
pub mod cache;
pub mod cli;
pub mod curriculum;
pub mod error;
pub mod intake;
pub mod metrics;
pub mod pipeline;
pub mod question;
pub mod scheduler;
pub mod sink;
pub mod status;
pub mod synthesis;
pub mod template;
pub mod validation;

// Re-export commonly used error types
pub use error::{
    CacheError, GenerationError, IntakeError, SelectorError, SinkError, SynthesisError,
    TemplateError,
};
