//! Textgen Backend Library
//!
//! Authenticated, OpenAI-compatible text-generation API.
//! Exposes core modules for use by the binary and integration tests.

pub mod auth;
pub mod config;
pub mod generation;
pub mod middleware;
pub mod server;

pub use config::Config;
pub use server::{build_state, create_router, run};
