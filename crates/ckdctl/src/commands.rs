//! Command handlers for ckdctl.

use crate::{input, output};
use anyhow::{bail, Context, Result};
use ckd_common::{cache, CkdConfig, ModelEntry, ModelLoader, Predictor, SchemaVariant};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Resolve a configured model and load it through the process-wide cache
pub fn load_model(config: &CkdConfig, name: Option<&str>) -> Result<(ModelEntry, Predictor)> {
    let entry = config.model(name)?.clone();
    let source = entry.source()?;
    let loader = ModelLoader::with_timeout(config.timeout())?;

    let model = cache::global()
        .get_or_load(&loader, &source, entry.sha256.as_deref())
        .with_context(|| format!("Cannot use model '{}'", entry.name))?;
    Ok((entry, Predictor::new(Arc::clone(&model))))
}

/// Handle predict command
pub fn predict(
    config: &CkdConfig,
    model: Option<&str>,
    file: Option<&Path>,
    assignments: &[String],
    json: bool,
    show_features: bool,
) -> Result<()> {
    let raw = input::collect(file, assignments)?;
    let (_, predictor) = load_model(config, model)?;

    let errors = predictor.validate(&raw);
    if !errors.is_empty() {
        output::print_field_errors(&errors);
        bail!("{} field(s) rejected", errors.len());
    }

    let prediction = predictor.predict(&raw)?;
    info!(
        "Prediction for model '{}': {}",
        prediction.model, prediction.label
    );

    if json {
        let report = output::PredictionReport::new(&prediction, &raw);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_prediction(&prediction, &raw, show_features);
    }
    Ok(())
}

/// Handle fields command
pub fn fields(config: &CkdConfig, model: Option<&str>, variant: Option<SchemaVariant>) -> Result<()> {
    let fields = match variant {
        Some(variant) => variant.fields(),
        None => load_model(config, model)?.1.fields(),
    };
    output::print_fields(fields);
    Ok(())
}

/// Handle inspect command
pub fn inspect(config: &CkdConfig, model: Option<&str>) -> Result<()> {
    let (entry, predictor) = load_model(config, model)?;
    output::print_model(&entry, predictor.model());
    Ok(())
}

/// Handle models command
pub fn models(config: &CkdConfig) -> Result<()> {
    if config.models.is_empty() {
        println!("No models configured.");
        return Ok(());
    }
    output::print_models(&config.models, config.default_model.as_deref());
    Ok(())
}

/// Handle config init command
pub fn config_init(
    target: Option<&Path>,
    models: &[String],
    pins: &[String],
    default: Option<&str>,
    force: bool,
) -> Result<()> {
    let path = match target {
        Some(path) => path.to_path_buf(),
        None => CkdConfig::user_config_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }

    let mut config = CkdConfig::default();
    if !models.is_empty() {
        let cwd = std::env::current_dir().context("Cannot determine current directory")?;
        config.models = models
            .iter()
            .map(|arg| {
                let (name, location) = input::split_pair(arg)?;
                let mut entry = ModelEntry::at(name, location);
                entry.path = entry.path.map(|p| absolute(&cwd, p));
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;
        config.default_model = config.models.first().map(|m| m.name.clone());
    }
    if let Some(default) = default {
        config.default_model = Some(default.to_string());
    }

    let mut pinned: HashMap<&str, &str> = HashMap::new();
    for arg in pins {
        let (name, digest) = input::split_pair(arg)?;
        pinned.insert(name, digest.trim());
    }
    config.models = config
        .models
        .into_iter()
        .map(|entry| match pinned.remove(entry.name.as_str()) {
            Some(digest) => entry.with_sha256(digest),
            None => entry,
        })
        .collect();
    if let Some(name) = pinned.keys().next() {
        bail!("--pin names unknown model '{}'", name);
    }

    config
        .validate()
        .context("Refusing to write an invalid configuration")?;
    config.save_to(&path)?;
    info!("Configuration written to {}", path.display());
    println!("Wrote {} ({} model(s))", path.display(), config.models.len());
    Ok(())
}

fn absolute(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
