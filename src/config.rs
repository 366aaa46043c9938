use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::session::{EngineConfig, GameKind, DEFAULT_COMBO_WINDOW_MS, DEFAULT_LIVES};

/// Persisted player defaults; command-line flags override them per run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub lives: u32,
    pub combo_window_ms: u64,
    pub time_limit_secs: Option<u64>,
    pub round_length: usize,
    pub player_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lives: DEFAULT_LIVES,
            combo_window_ms: DEFAULT_COMBO_WINDOW_MS,
            time_limit_secs: Some(60),
            round_length: 10,
            player_name: None,
        }
    }
}

impl Config {
    pub fn engine_config(&self, game: GameKind, challenge_id: Option<String>) -> EngineConfig {
        EngineConfig {
            initial_lives: self.lives,
            combo_window_ms: self.combo_window_ms,
            initial_time_ms: self.time_limit_secs.map(|s| s * 1000),
            challenge_id,
            game_type: Some(game),
            ..EngineConfig::default()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("ecoquest_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("ignoring unreadable config {}: {err}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("cfg").join("config.json"));
        let cfg = Config {
            lives: 5,
            combo_window_ms: 2500,
            time_limit_secs: None,
            round_length: 4,
            player_name: Some("Robin".into()),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn partial_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);

        fs::write(&path, r#"{"lives": 1}"#).unwrap();
        let cfg = store.load();
        assert_eq!(cfg.lives, 1);
        assert_eq!(cfg.round_length, Config::default().round_length);

        fs::write(&path, "lives = 1").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn engine_config_converts_seconds_and_tags_game() {
        let cfg = Config {
            time_limit_secs: Some(45),
            ..Config::default()
        };
        let engine = cfg.engine_config(GameKind::Quiz, Some("wk3".into()));

        assert_eq!(engine.initial_time_ms, Some(45_000));
        assert_eq!(engine.submission_target(), Some(("wk3", GameKind::Quiz)));
        assert!(engine.auto_start);
    }
}
