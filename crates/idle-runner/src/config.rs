use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub game: GameConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Catalog YAML; relative paths resolve against the project root. Absent = built-in catalog.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

fn default_max_queue_size() -> usize {
    idle_queue::DEFAULT_MAX_QUEUE_SIZE
}

fn default_db_path() -> String {
    ".idle/idle.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig {
                max_queue_size: default_max_queue_size(),
                catalog_path: Some(".idle/catalog.yaml".to_string()),
            },
            storage: StorageConfig { backend: StorageBackend::Sqlite, db_path: default_db_path() },
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse idle.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".idle").join("idle.toml")
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.storage.db_path)
    }

    pub fn catalog_path(&self, root: &Path) -> Option<PathBuf> {
        self.game.catalog_path.as_deref().map(|p| resolve(root, p))
    }
}

fn resolve(root: &Path, p: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(p).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let p = Config::config_path(dir.path());
        Config::default().save_to(&p).unwrap();
        assert_eq!(Config::load_from(&p).unwrap(), Config::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let cfg: Config = toml::from_str("[game]\n[storage]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(cfg.game.max_queue_size, 3);
        assert_eq!(cfg.game.catalog_path, None);
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.storage.db_path, ".idle/idle.db");
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let cfg = Config::default();
        let root = Path::new("/srv/game");
        assert_eq!(cfg.db_path(root), PathBuf::from("/srv/game/.idle/idle.db"));
        assert_eq!(cfg.catalog_path(root), Some(PathBuf::from("/srv/game/.idle/catalog.yaml")));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut cfg = Config::default();
        cfg.storage.db_path = "/var/lib/idle.db".into();
        assert_eq!(cfg.db_path(Path::new("/srv")), PathBuf::from("/var/lib/idle.db"));
    }
}
