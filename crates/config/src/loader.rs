use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::RelaybotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "relaybot.toml",
    "relaybot.yaml",
    "relaybot.yml",
    "relaybot.json",
];

const DATABASE_FILENAME: &str = "relaybot.db";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelaybotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the effective config: the explicit file when given, otherwise the
/// first discovered one, then environment overrides on top.
///
/// An explicit path that cannot be loaded is an error. A discovered file that
/// fails to parse falls back to defaults with a warning.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<RelaybotConfig> {
    let mut config = match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./relaybot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/relaybot/relaybot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelaybotConfig::default()` if no config file is found.
pub fn discover_and_load() -> RelaybotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelaybotConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/relaybot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relaybot").map(|d| d.config_dir().to_path_buf())
}

/// Returns the user data directory (`~/.local/share/relaybot/` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relaybot").map(|d| d.data_dir().to_path_buf())
}

/// SQLite file for the settings store: the configured path, else
/// `relaybot.db` in the data directory, else the working directory.
pub fn database_path(config: &RelaybotConfig) -> PathBuf {
    if let Some(path) = &config.database.path {
        return path.clone();
    }
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATABASE_FILENAME)
}

/// Apply `BOT_TOKEN`, `TARGET_CHANNEL_ID`, `PORT` and `RELAYBOT_DATABASE`
/// from the process environment.
pub fn apply_env_overrides(config: &mut RelaybotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut RelaybotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("BOT_TOKEN") {
        if !config.telegram.is_object() {
            config.telegram = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(telegram) = config.telegram.as_object_mut() {
            telegram.insert("token".into(), serde_json::Value::String(token));
        }
    }
    if let Some(channel) = var("TARGET_CHANNEL_ID") {
        config.relay.channel_id = Some(channel.trim().to_string());
    }
    if let Some(port) = var("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(path) = var("RELAYBOT_DATABASE") {
        config.database.path = Some(PathBuf::from(path));
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelaybotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
