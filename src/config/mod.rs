// src/config/mod.rs

//! Configuration loading and validation for taskdag.
//!
//! - `model.rs`: the serde data model.
//! - `loader.rs`: reading TOML or JSON from disk.
//! - `validate.rs`: `RawConfigFile` -> `ConfigFile` checks (dependencies,
//!   cycles, durations, levels).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig, parse_duration};
