//! # persona-cli
//!
//! Binary support for `persona`: argument parsing, config, tracing and the wiring from
//! config to stores, memory session and chat service.

pub mod app;
pub mod cli;
pub mod config;
pub mod logger;

pub use app::{build_embedder, App, PersonaDraft};
pub use cli::{CategoryAction, Cli, Commands};
pub use config::AppConfig;
pub use logger::init_tracing;
