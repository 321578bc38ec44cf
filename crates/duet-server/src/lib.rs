//! HTTP service that turns a text prompt into a two-person motion video.
//!
//! The model is loaded once per process into a shared [`duet_model::ModelHost`].
//! Each `/generate_motion` request runs inference, renders an mp4 under a
//! fresh task id and streams it back; the file is deleted once the response
//! is finished. `/translate` forwards to an external translation provider.

pub mod artifact;
pub mod config;
pub mod error;
pub mod generation;
pub mod routes;
pub mod state;
pub mod translation;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::ServerState;
