//! Output formatting - plain ASCII terminal output and JSON reports

use chrono::{DateTime, Utc};
use ckd_common::{CkdError, FieldSpec, Label, LoadedModel, ModelEntry, Prediction, RawInput};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Machine-readable prediction report
#[derive(Debug, Serialize)]
pub struct PredictionReport<'a> {
    pub model: &'a str,
    pub label: Label,
    pub class_code: i64,
    pub input: &'a RawInput,
    pub features: &'a ckd_common::FeatureVector,
    pub predicted_at: DateTime<Utc>,
}

impl<'a> PredictionReport<'a> {
    pub fn new(prediction: &'a Prediction, input: &'a RawInput) -> Self {
        Self {
            model: &prediction.model,
            label: prediction.label,
            class_code: prediction.class_code,
            input,
            features: &prediction.features,
            predicted_at: Utc::now(),
        }
    }
}

fn label_text(label: Label) -> String {
    let text = label.as_str().to_uppercase();
    match label {
        Label::Ckd => text.bright_red().to_string(),
        Label::NotCkd => text.bright_green().to_string(),
    }
}

/// Display a prediction to the user
pub fn print_prediction(prediction: &Prediction, input: &RawInput, show_features: bool) {
    println!();
    println!("Prediction: {}", label_text(prediction.label));
    println!(
        "{}",
        format!("model {} (class {})", prediction.model, prediction.class_code).dimmed()
    );

    println!();
    println!("[INPUT]");
    for (name, value) in input {
        println!("  {:<8} {}", name, value);
    }

    if show_features {
        println!();
        println!("[FEATURES]");
        for (name, value) in prediction.features.iter() {
            println!("  {:<16} {}", name, value);
        }
    }
}

/// Report every field-level problem of a submission
pub fn print_field_errors(errors: &[CkdError]) {
    eprintln!("{}", "[INVALID INPUT]".bright_red());
    for err in errors {
        match err.field() {
            Some(field) => eprintln!("  {:<8} {}", field, err),
            None => eprintln!("  {}", err),
        }
    }
}

/// List the form fields a model needs
pub fn print_fields(fields: &[FieldSpec]) {
    println!("{:<8} {:<12} {:<14} ALLOWED", "FIELD", "KIND", "UNIT");
    for field in fields {
        let kind = if field.is_categorical() {
            "categorical"
        } else {
            "numeric"
        };
        println!(
            "{:<8} {:<12} {:<14} {}",
            field.name,
            kind,
            field.unit,
            field.allowed_values.join(", ")
        );
    }
}

/// Describe a loaded model
pub fn print_model(entry: &ModelEntry, model: &LoadedModel) {
    let schema = model.schema();
    println!("[MODEL]");
    println!("  name         {}", model.name());
    if !model.description().is_empty() {
        println!("  description  {}", model.description());
    }
    match entry.source() {
        Ok(source) => println!("  source       {}", source),
        Err(e) => println!("  source       {}", e),
    }
    if let Some(digest) = model.sha256() {
        println!("  sha256       {}", digest);
    }
    println!("  classifier   {}", model.classifier_kind());
    println!("  schema       {}", schema.variant);
    println!("  policy       {}", schema.policy);
    println!(
        "  labels       ckd={} notckd={}",
        model.labels().ckd,
        model.labels().notckd
    );
    println!();
    println!("[FEATURES]");
    for (idx, name) in schema.feature_names.iter().enumerate() {
        println!("  {:>3}  {}", idx, name);
    }
}

/// List configured models, marking the default
pub fn print_models(entries: &[ModelEntry], default: Option<&str>) {
    for entry in entries {
        let marker = if Some(entry.name.as_str()) == default { "*" } else { " " };
        let (kind, location) = match entry.source() {
            Ok(source) if source.is_remote() => ("remote", source.to_string()),
            Ok(source) => ("local", source.to_string()),
            Err(e) => ("invalid", e.to_string()),
        };
        let pin = if entry.sha256.is_some() { " (pinned)" } else { "" };
        println!("{} {:<28} {:<7} {}{}", marker, entry.name, kind, location, pin);
    }
}
