//! Domain layer for precache
//!
//! Resource, response and store models plus the ports the adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AgentError, DomainError, DomainResult, FetchError, InitError, InvalidResource};
