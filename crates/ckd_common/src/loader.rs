//! Model artifact loader.
//!
//! Reads a bundle from local disk or fetches it over HTTP GET with an
//! explicit timeout. Every failure surfaces as `CkdError::ModelLoad` naming
//! the source that failed.

use crate::error::{CkdError, Result};
use crate::model::{LoadedModel, ModelBundle};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for remote fetches
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where a model artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Local(PathBuf),
    Remote(String),
}

impl ModelSource {
    /// `http://` and `https://` locations are remote, anything else is a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Remote(location.to_string())
        } else {
            Self::Local(PathBuf::from(location))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Blocking model loader
pub struct ModelLoader {
    client: reqwest::blocking::Client,
    /// Timeout for HTTP requests
    timeout: Duration,
}

impl ModelLoader {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CkdError::model_load("HTTP client", format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load, verify and validate a model artifact
    pub fn load(&self, source: &ModelSource, expected_sha256: Option<&str>) -> Result<LoadedModel> {
        let bytes = self.fetch_bytes(source)?;
        let digest = sha256_hex(&bytes);

        if let Some(expected) = expected_sha256 {
            check_digest(&digest, expected)
                .map_err(|reason| CkdError::model_load(source, reason))?;
            debug!("Digest verified for {}", source);
        }

        let model = ModelBundle::from_slice(&bytes)
            .and_then(ModelBundle::into_model)
            .map_err(|e| CkdError::model_load(source, e.to_string()))?
            .with_sha256(digest);

        info!(
            "Model '{}' loaded from {}: {} features, {} policy",
            model.name(),
            source,
            model.feature_names().len(),
            model.schema().policy
        );
        Ok(model)
    }

    fn fetch_bytes(&self, source: &ModelSource) -> Result<Vec<u8>> {
        match source {
            ModelSource::Local(path) => std::fs::read(path)
                .map_err(|e| CkdError::model_load(source, format!("failed to read file: {}", e))),
            ModelSource::Remote(url) => self
                .fetch_remote(url)
                .map_err(|reason| CkdError::model_load(source, reason)),
        }
    }

    fn fetch_remote(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        info!("📡  Fetching model artifact from {}", url);

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                format!("request timed out after {} seconds", self.timeout.as_secs())
            } else {
                format!("HTTP request failed: {}", e)
            }
        })?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        let bytes = response
            .bytes()
            .map_err(|e| format!("Failed to read response: {}", e))?;
        Ok(bytes.to_vec())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compare an artifact's hex SHA-256 against a pinned digest
pub(crate) fn check_digest(actual: &str, expected: &str) -> std::result::Result<(), String> {
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!(
            "SHA-256 mismatch: expected {}, got {}",
            expected.trim(),
            actual
        ))
    }
}
