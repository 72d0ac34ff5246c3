use crate::graph::ROOT_TYPE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BytegraphConfig {
    /// Mapping worker pool size; defaults to the available parallelism
    pub workers: Option<usize>,
    /// Universal root type of every hierarchy
    pub root_type: Option<String>,
    /// Resolve member mappings through the class hierarchy
    pub hierarchy_lookup: Option<bool>,
}

impl BytegraphConfig {
    pub fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
            .max(1)
    }

    pub fn root_type(&self) -> &str {
        self.root_type.as_deref().unwrap_or(ROOT_TYPE)
    }

    pub fn hierarchy_lookup(&self) -> bool {
        self.hierarchy_lookup.unwrap_or(true)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("bytegraph.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BytegraphConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BytegraphConfig = toml::from_str(&contents)?;
    if config.workers == Some(0) {
        anyhow::bail!("workers must be at least 1 in {}", path.display());
    }
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &BytegraphConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(&dir.path().join("bytegraph.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bytegraph.toml");
        let config = BytegraphConfig {
            workers: Some(3),
            root_type: Some("kotlin/Any".to_string()),
            hierarchy_lookup: Some(false),
        };
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.worker_count(), 3);
        assert_eq!(loaded.root_type(), "kotlin/Any");
        assert!(!loaded.hierarchy_lookup());
    }

    #[test]
    fn test_defaults() {
        let config = BytegraphConfig::default();
        assert!(config.worker_count() >= 1);
        assert_eq!(config.root_type(), ROOT_TYPE);
        assert!(config.hierarchy_lookup());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bytegraph.toml");
        std::fs::write(&path, "workers = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
