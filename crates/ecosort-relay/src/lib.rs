//! EcoSort Relay
//!
//! HTTP front for the EcoSort classifier. Camera devices POST an image to
//! `/analyze`; the relay forwards it to Gemini and answers with a normalized
//! `{ ok, result }` verdict.

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod gemini;
pub mod relay;
pub mod routes;
pub mod upload;

pub use cli::Cli;
pub use config::RelayConfig;
pub use relay::AppState;
pub use routes::create_router;
