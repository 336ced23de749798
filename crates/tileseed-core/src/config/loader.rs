//! Configuration loading
//!
//! A config file is parsed, then selected fields are overridden from the
//! environment, then the result is validated. Deployments usually ship one
//! file and inject service URLs per environment.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::CONFIG_FILE_NAMES;
use super::types::WorkerConfig;
use super::validation::validate_config;

/// On-disk config syntax, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }
}

/// Parse config text without touching the environment or validating
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<WorkerConfig> {
    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(ConfigError::YamlError)?,
        ConfigFormat::Toml => toml::from_str(content).map_err(ConfigError::TomlError)?,
    };
    Ok(config)
}

/// Environment variables that take precedence over the file
pub const ENV_OVERRIDES: &[&str] = &[
    "TILESEED_JOB_MANAGER_URL",
    "TILESEED_HEARTBEAT_URL",
    "TILESEED_JOB_TRACKER_URL",
    "TILESEED_MAPPROXY_API_URL",
    "TILESEED_SEED_CONCURRENCY",
    "TILESEED_MAX_ATTEMPTS",
];

/// Apply [`ENV_OVERRIDES`] looked up through `lookup`
pub fn apply_env_overrides<F>(config: &mut WorkerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for &name in ENV_OVERRIDES {
        let Some(value) = lookup(name) else {
            continue;
        };
        debug!(variable = name, "config value overridden from environment");

        match name {
            "TILESEED_JOB_MANAGER_URL" => config.queue.job_manager_url = value,
            "TILESEED_HEARTBEAT_URL" => config.queue.heartbeat_url = value,
            "TILESEED_JOB_TRACKER_URL" => config.job_tracker.url = value,
            "TILESEED_MAPPROXY_API_URL" => config.mapproxy.api_url = value,
            "TILESEED_SEED_CONCURRENCY" => config.mapproxy.seed_concurrency = parse_number(name, &value)?,
            "TILESEED_MAX_ATTEMPTS" => config.seeding.max_attempts = parse_number(name, &value)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected a non-negative integer, got '{}'", value),
        }
        .into()
    })
}

/// Load, override from the process environment and validate a config file
pub fn load_config(path: &Path) -> Result<WorkerConfig> {
    let format = ConfigFormat::from_path(path);
    info!(path = %path.display(), format = format.as_str(), "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config = parse_config(&content, format)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;
    Ok(config)
}

/// Paths checked in `dir`, in priority order
fn candidates(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    CONFIG_FILE_NAMES
        .iter()
        .flat_map(move |name| [dir.join(name), dir.join("config").join(name)])
}

/// Search `start_dir` and then each ancestor for a config file.
///
/// Within one directory every known file name is tried at the top level
/// and under `config/` before moving on to the next name.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let found = start_dir
        .ancestors()
        .find_map(|dir| candidates(dir).find(|path| path.is_file()));

    match &found {
        Some(path) => info!(path = %path.display(), "found config file"),
        None => debug!(start_dir = %start_dir.display(), "no config file found"),
    }
    found
}

/// Find and load the nearest config file above `dir`
pub fn load_config_from_dir(dir: &Path) -> Result<(WorkerConfig, PathBuf)> {
    let path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;
    let config = load_config(&path)?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/tileseed.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("tileseed.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("tileseed")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_find_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("tileseed.yaml");
        std::fs::write(&config_path, "seeding:\n  max_attempts: 3\n").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_yaml_over_toml() {
        let temp = TempDir::new().unwrap();
        let yaml_path = temp.path().join("tileseed.yaml");
        std::fs::write(&yaml_path, "seeding:\n  max_attempts: 3\n").unwrap();
        std::fs::write(temp.path().join("tileseed.toml"), "[seeding]\nmax_attempts = 4\n").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), yaml_path);
    }

    #[test]
    fn test_find_config_in_config_dir_of_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("config");
        std::fs::create_dir_all(&nested).unwrap();
        let config_path = nested.join("tileseed.toml");
        std::fs::write(&config_path, "[seeding]\nmax_attempts = 4\n").unwrap();
        let work = temp.path().join("work").join("deep");
        std::fs::create_dir_all(&work).unwrap();

        assert_eq!(find_config(&work).unwrap(), config_path);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("tileseed.toml");
        std::fs::write(
            &config_path,
            "[seeding]\nmax_attempts = 4\ninvalid_bbox_retry_limit = 2\n\n[mapproxy]\nseed_concurrency = 8\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.seeding.invalid_bbox_retry_limit, 2);
        assert_eq!(config.mapproxy.seed_concurrency, 8);
    }

    #[test]
    fn test_parse_config_yaml() {
        let config = parse_config(
            "queue:\n  job_manager_url: http://jobs:8080\nmapproxy:\n  seed_command: /usr/bin/mapproxy-seed\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.queue.job_manager_url, "http://jobs:8080");
        assert_eq!(config.mapproxy.seed_command, "/usr/bin/mapproxy-seed");
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = parse_config("queue:\n  job_manager_url: http://file:1\n", ConfigFormat::Yaml).unwrap();
        apply_env_overrides(
            &mut config,
            env(&[
                ("TILESEED_JOB_MANAGER_URL", "http://env:2"),
                ("TILESEED_MAPPROXY_API_URL", "http://mapproxy:3"),
                ("TILESEED_MAX_ATTEMPTS", " 9 "),
            ]),
        )
        .unwrap();

        assert_eq!(config.queue.job_manager_url, "http://env:2");
        assert_eq!(config.mapproxy.api_url, "http://mapproxy:3");
        assert_eq!(config.seeding.max_attempts, 9);
        assert_eq!(config.job_tracker.url, WorkerConfig::default().job_tracker.url);
    }

    #[test]
    fn test_env_override_rejects_bad_number() {
        let mut config = WorkerConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("TILESEED_SEED_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("TILESEED_SEED_CONCURRENCY"));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("tileseed.yaml");
        std::fs::write(&config_path, "mapproxy:\n  seed_concurrency: 0\n").unwrap();

        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn test_load_config_from_dir_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config_from_dir(temp.path()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
