//! Authentication & Authorization
//!
//! Stateless JWT bearer tokens over an injected in-memory credential store.
//! Token verification alone never grants access: the store is consulted on
//! every request so disabled accounts are locked out immediately.

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, AuthState, CurrentUser};
pub use user_store::UserStore;
