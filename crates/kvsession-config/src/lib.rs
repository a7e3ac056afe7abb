//! Configuration system for kvsession.
//!
//! Provides TOML-based configuration with:
//! - `[client]`, `[cache]` and `[metrics]` sections, each optional
//! - Config file layering (user config + project-local + explicit file)
//! - Conversion into the library crates' builder configs

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
