//! User configuration – reads/writes `~/.svs/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use svs_runtime::{LogFormat, SvsConfig};

/// Persisted user configuration stored in `~/.svs/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maintain relation tables every cycle.
    pub relations: bool,

    /// Log line format.
    pub log_format: LogFormat,

    /// Minimum number of cycles to run a scenario for.
    pub cycles: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relations: true,
            log_format: LogFormat::Compact,
            cycles: 1,
        }
    }
}

impl Config {
    pub fn svs_config(&self) -> SvsConfig {
        SvsConfig {
            relations: self.relations,
        }
    }
}

/// Return the path to `~/.svs/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".svs").join("config.toml")
}

/// Load the config from disk, falling back to defaults when the file does
/// not exist, and apply environment overrides.
pub fn load() -> Result<Config, String> {
    load_at(&config_path())
}

pub(crate) fn load_at(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `SVS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SVS_RELATIONS` | `relations` (`true`/`false`/`1`/`0`) |
/// | `SVS_CYCLES` | `cycles` |
/// | `SVS_LOG_FORMAT` | `log_format` (`compact`/`json`) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SVS_RELATIONS") {
        match v.as_str() {
            "true" | "1" => cfg.relations = true,
            "false" | "0" => cfg.relations = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("SVS_CYCLES")
        && let Ok(n) = v.parse::<u32>()
    {
        cfg.cycles = n;
    }
    cfg.log_format = LogFormat::from_env(cfg.log_format);
}

/// Save the config, creating `~/.svs/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.cycles = 7;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.cycles, 7);
        assert!(loaded.relations);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "relations = false\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert!(!loaded.relations);
        assert_eq!(loaded.cycles, 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cycles = \"many\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_svs_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".svs"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_cycles() {
        // SAFETY: no other test reads or writes SVS_CYCLES.
        unsafe { std::env::set_var("SVS_CYCLES", "12") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.cycles, 12);

        // Overrides apply even when there is no config file.
        let dir = tempfile::tempdir().expect("tmp dir");
        let loaded = load_at(&dir.path().join("config.toml")).expect("load ok");
        assert_eq!(loaded.cycles, 12);
        assert!(loaded.relations);
        unsafe { std::env::remove_var("SVS_CYCLES") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_relations() {
        // SAFETY: no other test reads or writes SVS_RELATIONS.
        unsafe { std::env::set_var("SVS_RELATIONS", "maybe") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(cfg.relations);

        unsafe { std::env::set_var("SVS_RELATIONS", "0") };
        apply_env_overrides(&mut cfg);
        assert!(!cfg.relations);
        unsafe { std::env::remove_var("SVS_RELATIONS") };
    }
}
