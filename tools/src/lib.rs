//! Command-line helpers for inspecting discriminator configurations.

pub mod config;

pub use config::{expand_env, expand_path, InputShape, SummaryConfig};
