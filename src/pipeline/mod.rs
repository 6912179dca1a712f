//! Pipeline coordination: configuration, the per-slot generation loop,
//! and the orchestrator that ties intake, queue, workers, cache, sink and
//! status together.

pub mod config;
pub mod generation;
pub mod orchestrator;

pub use config::{ConfigError, PipelineConfig};
pub use generation::{GenerationLoop, GenerationOutput};
pub use orchestrator::{GenerationService, PipelineError, PipelineOrchestrator};
