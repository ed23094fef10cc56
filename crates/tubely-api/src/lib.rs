//! Tubely HTTP API
//!
//! Exposed as a library so the router can be built and exercised in
//! integration tests without a database or a listening socket.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod video_store_impl;

pub use error::{ErrorResponse, HttpAppError};
pub use setup::routes::setup_routes;
pub use state::AppState;
