//! CLI commands module.

mod classify;
mod config;

pub use classify::ClassifyCommand;
pub use config::ConfigCommand;
