//! HTTP middleware.
//!
//! Request-level concerns that sit between routing and handlers.

pub mod logging;

pub use logging::request_logging;
