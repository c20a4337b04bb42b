pub mod auth;
pub mod middleware;
pub mod mismatch_task;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod study;
pub mod study_handler;

// Re-export the study WebSocket handler and the router builder for the binary.
pub use middleware::require_sign_in;
pub use router::build_router;
pub use study_handler::study_handler;
