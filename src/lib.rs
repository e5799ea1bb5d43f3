//! Chat widget gateway.
//!
//! Serves an embeddable chat widget and proxies its conversations to a hosted
//! assistant API, with a small admin console for runtime configuration.

pub mod assistant;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod settings;
pub mod web;

pub use config::Config;
