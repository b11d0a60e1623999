//! # PMOVideo Configuration Module
//!
//! Configuration is a YAML tree built from three layers, each one
//! overriding the previous:
//!
//! 1. the defaults embedded in the binary (`pmovideo.yaml`)
//! 2. `config.yaml` in the configuration directory
//! 3. `PMOVIDEO_CONFIG__SECTION__KEY=value` environment variables
//!
//! Keys are case-insensitive: every key is stored lower-cased. The merged
//! tree is written back to `config.yaml` at load time and after every
//! setter, so the file always shows the effective configuration.
//!
//! Crates of the workspace add their own accessors through extension traits
//! (`VideoApiConfigExt` in pmovideo, `PlaybackConfigExt` in pmoplayback)
//! generated with [`impl_string_config!`], [`impl_u64_config!`] and
//! [`impl_bool_config!`] on top of [`Config::get_value`] and
//! [`Config::set_value`].
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, bail};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmovideo.yaml");

const CONFIG_FILE_NAME: &str = "config.yaml";
const ENV_CONFIG_DIR: &str = "PMOVIDEO_CONFIG";
const ENV_PREFIX: &str = "PMOVIDEO_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmovideo";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMOVideo configuration"));
}

/// Generates a getter/setter pair for a `u64` key with a default
#[macro_export]
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        fn $getter(&self) -> anyhow::Result<u64> {
            Ok(match self.get_value($path) {
                Ok(serde_yaml::Value::Number(n)) => n.as_u64().unwrap_or($default),
                Ok(serde_yaml::Value::String(s)) => s.trim().parse::<u64>().unwrap_or($default),
                _ => $default,
            })
        }

        fn $setter(&self, value: u64) -> anyhow::Result<()> {
            self.set_value($path, serde_yaml::Value::Number(value.into()))
        }
    };
}

/// Generates a getter/setter pair for a `bool` key with a default
#[macro_export]
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        fn $getter(&self) -> anyhow::Result<bool> {
            Ok(match self.get_value($path) {
                Ok(serde_yaml::Value::Bool(b)) => b,
                _ => $default,
            })
        }

        fn $setter(&self, value: bool) -> anyhow::Result<()> {
            self.set_value($path, serde_yaml::Value::Bool(value))
        }
    };
}

/// Generates a getter/setter pair for a non-empty `String` key with a default
#[macro_export]
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        fn $getter(&self) -> anyhow::Result<String> {
            Ok(match self.get_value($path) {
                Ok(serde_yaml::Value::String(s)) if !s.trim().is_empty() => s,
                _ => $default.to_string(),
            })
        }

        fn $setter(&self, value: String) -> anyhow::Result<()> {
            self.set_value($path, serde_yaml::Value::String(value))
        }
    };
}

/// Configuration manager for PMOVideo
#[derive(Debug)]
pub struct Config {
    directory: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Determines and prepares the configuration directory
    ///
    /// Lookup order:
    /// 1. `directory` when not empty
    /// 2. the `PMOVIDEO_CONFIG` environment variable
    /// 3. `.pmovideo` in the current directory, if it exists
    /// 4. `.pmovideo` in the home directory, if it exists
    /// 5. `.pmovideo` in the current directory, created
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = resolve_directory(directory);
        prepare_directory(&dir)?;
        Ok(dir.to_string_lossy().into_owned())
    }

    /// Loads the layered configuration and writes the result back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let directory = PathBuf::from(Self::config_dir(directory)?);
        let file = directory.join(CONFIG_FILE_NAME);
        info!(config_dir=%directory.display(), "Using config directory");

        let mut tree = parse_layer(DEFAULT_CONFIG).context("embedded default configuration")?;

        match fs::read_to_string(&file) {
            Ok(text) => {
                info!(config_file=%file.display(), "Loaded config file");
                let user = parse_layer(&text)
                    .with_context(|| format!("invalid YAML in {}", file.display()))?;
                overlay(&mut tree, user);
            }
            Err(_) => {
                info!(config_file=%file.display(), "Config file not found, using embedded defaults");
            }
        }

        apply_env_overrides(&mut tree);

        let config = Config {
            directory,
            file,
            data: Mutex::new(tree),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of `config.yaml`
    pub fn file_path(&self) -> &Path {
        &self.file
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes the current tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.file, yaml)
            .with_context(|| format!("cannot write {}", self.file.display()))
    }

    /// Sets the value at `path` (e.g. `&["api", "base_url"]`) and saves.
    ///
    /// Missing intermediate sections are created.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.data(), path, value)?;
        self.save()
    }

    /// Value at `path`; an error if any segment is missing.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data();
        let mut node = &*data;
        for (depth, key) in path.iter().enumerate() {
            node = match node {
                Value::Mapping(map) => map
                    .get(key.to_lowercase().as_str())
                    .with_context(|| format!("Path {} does not exist", path[..=depth].join(".")))?,
                _ => bail!("Path {} is not a section", path[..depth].join(".")),
            };
        }
        Ok(node.clone())
    }

    /// Niveau de log minimum (`host.logger.min_level`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        })
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    /// Whether log lines go to the console (`host.logger.enable_console`)
    pub fn get_log_enable_console(&self) -> Result<bool> {
        Ok(match self.get_value(&["host", "logger", "enable_console"]) {
            Ok(Value::Bool(b)) => b,
            _ => DEFAULT_LOG_ENABLE_CONSOLE,
        })
    }

    pub fn set_log_enable_console(&self, enabled: bool) -> Result<()> {
        self.set_value(&["host", "logger", "enable_console"], Value::Bool(enabled))
    }
}

/// Returns the global configuration, loaded on first access.
///
/// ```no_run
/// use pmoconfig::get_config;
///
/// let config = get_config();
/// let level = config.get_log_min_level();
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn resolve_directory(directory: &str) -> PathBuf {
    if !directory.is_empty() {
        return PathBuf::from(directory);
    }

    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory from environment");
        return PathBuf::from(from_env);
    }

    let local = PathBuf::from(CONFIG_DIR_NAME);
    if local.is_dir() {
        return local;
    }

    match home_dir().map(|home| home.join(CONFIG_DIR_NAME)) {
        Some(in_home) if in_home.is_dir() => in_home,
        _ => local,
    }
}

/// Creates `dir` if needed and checks it is readable and writable.
fn prepare_directory(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"test").with_context(|| format!("{} is not writable", dir.display()))?;
    fs::remove_file(&probe)?;
    fs::read_dir(dir)?;
    Ok(())
}

/// Parses one YAML layer and lower-cases its keys.
fn parse_layer(text: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(text)?;
    Ok(normalize_keys(value))
}

fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, child)| {
                    let key = match key {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, normalize_keys(child))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Merges `top` into `base`: sections are merged key by key, anything else
/// from `top` replaces what `base` had.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Mapping(base_map), Value::Mapping(top_map)) => {
            for (key, top_child) in top_map {
                match base_map.get_mut(&key) {
                    Some(base_child) => overlay(base_child, top_child),
                    None => {
                        base_map.insert(key, top_child);
                    }
                }
            }
        }
        // Un fichier vide ne remplace rien
        (_, Value::Null) => {}
        (base, top) => *base = top,
    }
}

fn insert_at(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        let Value::Mapping(map) = node else {
            bail!("Cannot set {}: {key} is under a scalar", path.join("."));
        };
        node = map
            .entry(Value::String(key.to_lowercase()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    let Value::Mapping(map) = node else {
        bail!("Cannot set {}: parent is not a section", path.join("."));
    };
    map.insert(Value::String(last.to_lowercase()), value);
    Ok(())
}

/// `PMOVIDEO_CONFIG__API__BASE_URL=http://...` sets `api.base_url`.
/// Values are read as YAML scalars, so numbers and booleans keep their type.
fn apply_env_overrides(tree: &mut Value) {
    for (name, raw) in env::vars() {
        let Some(stripped) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = stripped.split("__").collect();
        match insert_at(tree, &path, env_value(&raw)) {
            Ok(()) => debug!(env_var=%name, "Configuration override applied"),
            Err(err) => warn!(env_var=%name, error=%err, "Ignoring configuration override"),
        }
    }
}

fn env_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
