//! Council Domain Module
//!
//! This module contains all council business logic, including:
//! - Domain models (members, responses, result envelope)
//! - The request orchestrator (outbound completion call, fallback policy)
//! - The payload normalizer (structural search, strict validation)
//! - Static configuration and application state
//! - REST API handlers

pub mod config;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod state;

// Re-export commonly used types for convenience
pub use config::CouncilConfig;
pub use handlers::routes;
pub use models::{CouncilMember, CouncilResponse, CouncilResult, ResultSource};
pub use orchestrator::consult;
pub use state::{AppState, SharedState};
