//! Runtime configuration: optional YAML file, then environment overrides.
//!
//! Priority: env var > YAML > default. A missing or unparsable file falls
//! back to defaults so the CLI stays usable without any setup.
//!
//! ```yaml
//! database:
//!   path: /var/lib/notegraph/notes.sqlite3
//! logging:
//!   level: info
//!   dir: /var/log/notegraph
//! embedding:
//!   backend: fastembed   # or `hash`; default depends on the build
//!   model: all-minilm-l6-v2
//!   cache_dir: /var/cache/fastembed
//! similarity:
//!   default_threshold: 0.5
//! projection:
//!   seed: 42
//!   min_dist: 0.1
//!   require_deterministic: true
//! ```

use crate::logging::default_log_level;
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "notegraph.yaml";

pub const ENV_DB_PATH: &str = "NOTEGRAPH_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "NOTEGRAPH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTEGRAPH_LOG_DIR";
pub const ENV_EMBEDDING_BACKEND: &str = "NOTEGRAPH_EMBEDDING_BACKEND";
pub const ENV_MODEL: &str = "FASTEMBED_MODEL";
pub const ENV_MODEL_CACHE_DIR: &str = "FASTEMBED_CACHE_DIR";
pub const ENV_SIMILARITY_THRESHOLD: &str = "NOTEGRAPH_SIMILARITY_THRESHOLD";
pub const ENV_PROJECTION_SEED: &str = "NOTEGRAPH_PROJECTION_SEED";

/// Top-level configuration file structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub similarity: SimilarityConfig,
    pub projection: ProjectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "notegraph.sqlite3".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; file logging is off when unset.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().into(),
            dir: None,
        }
    }
}

/// Which embedding model implementation backs the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Fastembed,
    Hash,
}

impl EmbeddingBackend {
    /// `Fastembed` when compiled in, otherwise the offline hash model.
    pub fn compiled_default() -> Self {
        if cfg!(feature = "fastembed") {
            Self::Fastembed
        } else {
            Self::Hash
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fastembed" => Some(Self::Fastembed),
            "hash" => Some(Self::Hash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub cache_dir: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::compiled_default(),
            model: "all-minilm-l6-v2".into(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub default_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub seed: u64,
    /// Minimum spacing hint for the distance-emphasis projection.
    pub min_dist: f64,
    /// Refuse providers that cannot be seeded.
    pub require_deterministic: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            min_dist: 0.1,
            require_deterministic: true,
        }
    }
}

impl AppConfig {
    /// Loads `yaml_path` (or `notegraph.yaml` in the working directory) and
    /// applies process environment overrides.
    pub fn load(yaml_path: Option<&Path>) -> Self {
        let mut config = Self::load_yaml(yaml_path);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Parses configuration from YAML text without touching the environment.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Applies overrides from a key lookup (the environment in production).
    ///
    /// Unparsable numeric or enum values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = path;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|dir| !dir.trim().is_empty()) {
            self.logging.dir = Some(dir);
        }
        if let Some(value) = lookup(ENV_EMBEDDING_BACKEND) {
            match EmbeddingBackend::parse(&value) {
                Some(backend) => self.embedding.backend = backend,
                None => warn!("event=config_override module=config status=ignored key={ENV_EMBEDDING_BACKEND} value={value}"),
            }
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|model| !model.trim().is_empty()) {
            self.embedding.model = model;
        }
        if let Some(dir) = lookup(ENV_MODEL_CACHE_DIR).filter(|dir| !dir.trim().is_empty()) {
            self.embedding.cache_dir = Some(dir);
        }
        if let Some(value) = lookup(ENV_SIMILARITY_THRESHOLD) {
            match value.trim().parse::<f64>() {
                Ok(threshold) if threshold.is_finite() => {
                    self.similarity.default_threshold = threshold;
                }
                _ => warn!("event=config_override module=config status=ignored key={ENV_SIMILARITY_THRESHOLD} value={value}"),
            }
        }
        if let Some(value) = lookup(ENV_PROJECTION_SEED) {
            match value.trim().parse::<u64>() {
                Ok(seed) => self.projection.seed = seed,
                Err(_) => warn!("event=config_override module=config status=ignored key={ENV_PROJECTION_SEED} value={value}"),
            }
        }
    }

    fn load_yaml(yaml_path: Option<&Path>) -> Self {
        let path = yaml_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_yaml_str(&contents) {
                Ok(config) => {
                    info!(
                        "event=config_load module=config status=ok path={}",
                        path.display()
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        "event=config_load module=config status=error path={} error={err}",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                debug!(
                    "event=config_load module=config status=missing path={}",
                    path.display()
                );
                Self::default()
            }
        }
    }
}
