//! Configuration loading and env substitution.
//!
//! Config files: `relaybot.toml`, `relaybot.yaml`, or `relaybot.json`
//! Searched in `./` then `~/.config/relaybot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file, and a fixed set of environment overrides applied after parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, config_dir, data_dir, database_path, discover_and_load, load,
        load_config,
    },
    schema::{DatabaseConfig, RelayConfig, RelaybotConfig, ServerConfig},
};
