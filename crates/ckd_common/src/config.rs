//! CKD configuration.
//!
//! Config file: ~/.config/ckd/config.toml or /etc/ckd/config.toml
//!
//! ```toml
//! default_model = "decision_tree_model"
//! timeout_secs = 30
//!
//! [[models]]
//! name = "decision_tree_model"
//! path = "/var/lib/ckd/decision_tree_model.json"
//!
//! [[models]]
//! name = "best_decision_tree_model"
//! url = "https://models.example.org/best_decision_tree_model.json"
//! sha256 = "..."
//! ```

use crate::loader::{ModelSource, DEFAULT_TIMEOUT_SECS};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "CKD_CONFIG";

/// One selectable model artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,

    /// Local artifact path; relative paths resolve against the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Remote artifact URL (HTTP GET)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Expected SHA-256 of the artifact bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ModelEntry {
    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            url: None,
            sha256: None,
        }
    }

    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            url: Some(url.into()),
            sha256: None,
        }
    }

    /// Entry for a location that is either an http(s) URL or a path
    pub fn at(name: impl Into<String>, location: &str) -> Self {
        match ModelSource::parse(location) {
            ModelSource::Local(path) => Self::local(name, path),
            ModelSource::Remote(url) => Self::remote(name, url),
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    pub fn source(&self) -> Result<ModelSource> {
        match (&self.path, &self.url) {
            (Some(path), None) => Ok(ModelSource::Local(path.clone())),
            (None, Some(url)) => Ok(ModelSource::Remote(url.clone())),
            (Some(_), Some(_)) => bail!("model '{}' sets both path and url", self.name),
            (None, None) => bail!("model '{}' sets neither path nor url", self.name),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CkdConfig {
    /// Model used when none is named explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Remote fetch timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl Default for CkdConfig {
    fn default() -> Self {
        Self {
            default_model: Some("decision_tree_model".to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            models: vec![
                ModelEntry::local(
                    "decision_tree_model",
                    "/var/lib/ckd/decision_tree_model.json",
                ),
                ModelEntry::local(
                    "best_decision_tree_model",
                    "/var/lib/ckd/best_decision_tree_model.json",
                ),
            ],
        }
    }
}

impl CkdConfig {
    /// Get default user config path: ~/.config/ckd/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(config_dir.join("ckd").join("config.toml"))
    }

    /// Get system config path: /etc/ckd/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/ckd/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path
    /// 2. $CKD_CONFIG
    /// 3. User config (~/.config/ckd/config.toml)
    /// 4. System config (/etc/ckd/config.toml)
    /// 5. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Self::load_from(Path::new(&path));
            }
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load and validate one config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: CkdConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for entry in &mut self.models {
            if let Some(path) = entry.path.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }

        let mut names = HashSet::new();
        for entry in &self.models {
            if !names.insert(entry.name.as_str()) {
                bail!("model '{}' is defined more than once", entry.name);
            }
            entry.source()?;
        }

        if let Some(default) = &self.default_model {
            if !names.contains(default.as_str()) {
                bail!("default_model '{}' is not among the configured models", default);
            }
        }
        Ok(())
    }

    /// Look up a model by name, falling back to the default model
    pub fn model(&self, name: Option<&str>) -> Result<&ModelEntry> {
        let name = match name.or(self.default_model.as_deref()) {
            Some(name) => name,
            None => match self.models.as_slice() {
                [only] => return Ok(only),
                [] => bail!("no models configured"),
                _ => bail!("several models configured and no default_model set"),
            },
        };

        self.models
            .iter()
            .find(|m| m.name == name)
            .with_context(|| format!("unknown model '{}'", name))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Save configuration as TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
