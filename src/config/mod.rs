// src/config/mod.rs

//! Configuration loading and validation for gatsby-helper.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Expand `$VAR` / `${VAR}` references in settings (`env.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate webhook URLs and timing values (`validate.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::{expand_env, expand_env_with};
pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BuildsSection, ConfigFile, DeltasSection, PreviewSection, RawConfigFile, Settings,
};
pub use validate::validate_config;
