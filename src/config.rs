//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$SOLRFACADE_CONFIG` (environment variable)
//! 2. `~/.config/solrfacade/config.toml` (Linux)
//!    `%APPDATA%\solrfacade\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::mapping::TextRole;
use crate::model::Visibility;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Index backend connection.
    pub solr: SolrConfig,
    /// Search defaults and tuning.
    pub search: SearchConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Index backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    /// Base URL of the Solr server, without core name.
    pub base_url: String,
    /// Core holding public documents.
    pub public_core: String,
    /// Core holding private documents.
    pub private_core: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    pub read_timeout_ms: u64,
}

/// Search defaults and tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size when the request has none.
    pub default_limit: usize,
    /// Upper bound for the requested page size.
    pub max_limit: usize,
    /// Facet bucket limit when the request has none.
    pub default_facet_limit: i64,
    /// Minimum bucket count when the request has none.
    pub default_facet_mincount: u32,
    /// Free-text field weights.
    pub boosts: BoostConfig,
}

/// Weight of each text-field role in the free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    pub content: f32,
    pub title: f32,
    pub r#abstract: f32,
    pub title_alias: f32,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr".to_string(),
            public_core: "public".to_string(),
            private_core: "private".to_string(),
            connect_timeout_ms: 2_000,
            read_timeout_ms: 10_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            default_facet_limit: 100,
            default_facet_mincount: 1,
            boosts: BoostConfig::default(),
        }
    }
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            content: 1.0,
            title: 2.0,
            r#abstract: 1.5,
            title_alias: 0.8,
        }
    }
}

impl BoostConfig {
    pub fn weight(&self, role: TextRole) -> f32 {
        match role {
            TextRole::Content => self.content,
            TextRole::Title => self.title,
            TextRole::Abstract => self.r#abstract,
            TextRole::TitleAlias => self.title_alias,
        }
    }
}

impl SolrConfig {
    /// Core name serving `visibility`.
    pub fn core(&self, visibility: Visibility) -> &str {
        match visibility {
            Visibility::Public => &self.public_core,
            Visibility::Private => &self.private_core,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| SearchError::invalid_file(path, e))
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("SOLRFACADE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("solrfacade").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("solrfacade")
}
