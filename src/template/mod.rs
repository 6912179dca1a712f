//! Template system for question generation.
//!
//! Templates are reusable question structures bound to a curriculum mapping
//! and difficulty, defined in YAML files and loaded into an in-memory
//! registry at startup. The registry is read-only reference data: many jobs
//! read the same template concurrently without locking.
//!
//! # Example
//!
//! ```ignore
//! use quizforge::template::{TemplateRegistry, TemplateSelector};
//!
//! let mut registry = TemplateRegistry::new();
//! registry.load_directory("templates/")?;
//!
//! let selector = TemplateSelector::new(Arc::new(registry));
//! let template = selector.select(&curriculum, Difficulty::Medium, &excluded)?;
//! ```

pub mod registry;
pub mod schema;
pub mod selector;

pub use registry::TemplateRegistry;
pub use schema::QuestionTemplate;
pub use selector::{SelectionStrategy, TemplateSelector};
