//! Text Generation
//!
//! The orchestration layer between the HTTP surface and the model backend:
//! request validation, single-flight model loading, bounded concurrency,
//! token accounting, and the OpenAI-compatible response envelope.

pub mod api;
pub mod generator;
pub mod lifecycle;
pub mod schemas;
pub mod service;

pub use api::GenerationState;
pub use generator::{Generator, GeneratorLoader, HubLoader};
pub use lifecycle::{ModelManager, ModelState};
pub use service::{CompletionError, CompletionService};
