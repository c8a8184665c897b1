//! varql configuration
//!
//! ```toml
//! format = "json"
//! database_url = "sqlite://data.db"
//! tables = ["movies"]
//!
//! [sources]
//! state = "state.json"
//! user = "/abs/path/user.toml"
//! ```
//!
//! Relative source paths are resolved against the config file's directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::context::{Context, ContextBuilder};
use crate::error::{VarqlError, VarqlResult};
use crate::value::Value;

/// Output format for evaluated results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Source name → data file (`.json` or `.toml`)
    #[serde(default)]
    pub sources: BTreeMap<String, PathBuf>,

    /// Default output format
    pub format: Option<OutputFormat>,

    /// Database URL for SQL-backed sources
    pub database_url: Option<String>,

    /// Tables loaded from `database_url`
    #[serde(default)]
    pub tables: Vec<String>,

    /// Source name the loaded tables are registered under
    #[serde(default = "default_db_source")]
    pub db_source: String,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_db_source() -> String {
    "db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
            format: None,
            database_url: None,
            tables: Vec::new(),
            db_source: default_db_source(),
            base_dir: None,
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `<config dir>/varql/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("varql").join("config.toml"))
    }

    /// Load from `path`, which must exist, or from the default path if it
    /// exists. With neither, the default configuration is returned.
    pub fn load(path: Option<&Path>) -> VarqlResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> VarqlResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| VarqlError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        debug!(path = %path.display(), sources = config.sources.len(), "loaded config");
        Ok(config)
    }

    /// Resolve a source path against the config file's directory.
    pub fn source_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load every file source into a context builder.
    pub fn context_builder(&self) -> VarqlResult<ContextBuilder> {
        self.sources
            .iter()
            .try_fold(Context::builder(), |builder, (name, path)| {
                let value = load_source_file(&self.source_path(path))?;
                Ok(builder.source(name.clone(), value))
            })
    }

    /// Load every file source into a context.
    pub fn context(&self) -> VarqlResult<Context> {
        Ok(self.context_builder()?.build())
    }
}

/// Read a `.json` or `.toml` data file into a [`Value`].
pub fn load_source_file(path: &Path) -> VarqlResult<Value> {
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let json: serde_json::Value = serde_json::from_str(&content)?;
            Ok(Value::from(json))
        }
        Some("toml") => {
            let table: toml::Table = toml::from_str(&content)?;
            Ok(Value::from(toml::Value::Table(table)))
        }
        _ => Err(VarqlError::Config(format!(
            "unsupported source file '{}' (expected .json or .toml)",
            path.display()
        ))),
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Register a file source
    pub fn source(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.config.sources.insert(name.into(), path.into());
        self
    }

    /// Set the output format
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = Some(format);
        self
    }

    /// Set the database URL
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    /// Add a table to load from the database
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.tables.push(table.into());
        self
    }

    /// Set the source name for database tables
    pub fn db_source(mut self, name: impl Into<String>) -> Self {
        self.config.db_source = name.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}
