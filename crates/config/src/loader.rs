use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::PadlinkConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "padlink.toml",
    "padlink.yaml",
    "padlink.yml",
    "padlink.json",
];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, config discovery only looks in
/// this directory (project-local and user-global paths are skipped).
/// Can be called multiple times (e.g. in tests) — each call replaces the
/// previous override.
pub fn set_config_dir(path: PathBuf) {
    if let Ok(mut dir) = CONFIG_DIR_OVERRIDE.lock() {
        *dir = Some(path);
    }
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    if let Ok(mut dir) = CONFIG_DIR_OVERRIDE.lock() {
        *dir = None;
    }
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().ok().and_then(|dir| dir.clone())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PadlinkConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./padlink.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/padlink/padlink.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PadlinkConfig::default()` if no config file is found.
pub fn discover_and_load() -> PadlinkConfig {
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
    PadlinkConfig::default()
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched —
/// project-local and user-global paths are skipped for isolation.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set — don't fall through to other locations.
        return None;
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/padlink/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("padlink")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PadlinkConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn write_and_load(name: &str, contents: &str) -> PadlinkConfig {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), contents).unwrap();
        set_config_dir(dir.path().to_path_buf());
        let config = discover_and_load();
        clear_config_dir();
        config
    }

    #[test]
    #[serial]
    fn loads_toml() {
        let config = write_and_load(
            "padlink.toml",
            "[server]\nport = 9000\n\n[relay]\nidle_threshold_secs = 60\n",
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.relay.idle_threshold_secs, 60);
    }

    #[test]
    #[serial]
    fn loads_yaml() {
        let config = write_and_load("padlink.yaml", "server:\n  port: 9001\n");
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    #[serial]
    fn loads_json() {
        let config = write_and_load("padlink.json", r#"{"server": {"port": 9002}}"#);
        assert_eq!(config.server.port, 9002);
    }

    #[test]
    #[serial]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());
        let config = discover_and_load();
        clear_config_dir();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    #[serial]
    fn unparsable_file_yields_defaults() {
        let config = write_and_load("padlink.toml", "this is not toml {{{");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    #[serial]
    fn substitutes_env_vars() {
        unsafe { std::env::set_var("PADLINK_TEST_BIND", "0.0.0.0") };
        let config = write_and_load("padlink.toml", "[server]\nbind = \"${PADLINK_TEST_BIND}\"\n");
        unsafe { std::env::remove_var("PADLINK_TEST_BIND") };
        assert_eq!(config.server.bind, "0.0.0.0");
    }
}
