pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod filename;
pub mod job;
pub mod worker;
