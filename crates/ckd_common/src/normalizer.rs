//! Feature normalizer.
//!
//! Turns one raw form submission into a [`FeatureVector`] aligned to the
//! exact columns and order a classifier was trained on:
//!
//! 1. numeric fields are coerced to `f64`
//! 2. categorical fields are replaced by their code (or indicator column)
//! 3. the result is reconciled against the model's feature names
//!
//! Normalization is a pure function of its inputs. Any error aborts the
//! whole record; no partial vector is returned.

use crate::encoding::EncodingTable;
use crate::error::{CkdError, Result};
use crate::features::{FeatureValue, FeatureVector};
use crate::schema::{FieldKind, FieldSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Raw field value as collected by a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{}", v),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

/// Field name -> raw value for one submission
pub type RawInput = BTreeMap<String, RawValue>;

/// How categorical fields are laid out for a given model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationPolicy {
    /// One column per field, categories label-encoded in place
    Direct,
    /// One-hot indicator columns, missing model columns backfilled with 0
    Expand,
}

impl std::fmt::Display for ReconciliationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Expand => write!(f, "expand"),
        }
    }
}

/// A field after type coercion and encoding
#[derive(Debug, Clone, PartialEq)]
enum Encoded<'a> {
    Number(f64),
    Category { value: &'a str, code: i64 },
}

/// Normalize one submission into a model-ready feature vector.
pub fn normalize(
    raw: &RawInput,
    specs: &[FieldSpec],
    encoding: &EncodingTable,
    model_features: &[String],
    policy: ReconciliationPolicy,
) -> Result<FeatureVector> {
    let encoded = specs
        .iter()
        .map(|spec| encode_field(raw, spec, encoding).map(|e| (spec, e)))
        .collect::<Result<Vec<_>>>()?;

    match policy {
        ReconciliationPolicy::Direct => reconcile_direct(&encoded, model_features),
        ReconciliationPolicy::Expand => reconcile_expand(&encoded, model_features),
    }
}

/// Check every field of a submission and collect all field-level errors.
pub fn validate(raw: &RawInput, specs: &[FieldSpec], encoding: &EncodingTable) -> Vec<CkdError> {
    specs
        .iter()
        .filter_map(|spec| encode_field(raw, spec, encoding).err())
        .collect()
}

fn encode_field<'a>(
    raw: &'a RawInput,
    spec: &FieldSpec,
    encoding: &EncodingTable,
) -> Result<Encoded<'a>> {
    let value = raw.get(spec.name).ok_or_else(|| CkdError::MissingField {
        field: spec.name.to_string(),
    })?;

    match spec.kind {
        FieldKind::Numeric => coerce_numeric(spec.name, value).map(Encoded::Number),
        FieldKind::Categorical => {
            let text = match value {
                RawValue::Text(s) => s.trim(),
                RawValue::Number(_) => {
                    return Err(CkdError::UnknownCategory {
                        field: spec.name.to_string(),
                        value: value.to_string(),
                    })
                }
            };
            let code = encoding
                .code(spec.name, text)
                .ok_or_else(|| CkdError::UnknownCategory {
                    field: spec.name.to_string(),
                    value: text.to_string(),
                })?;
            Ok(Encoded::Category { value: text, code })
        }
    }
}

fn coerce_numeric(field: &str, value: &RawValue) -> Result<f64> {
    let parsed = match value {
        RawValue::Number(v) => Some(*v),
        RawValue::Text(s) => s.trim().parse::<f64>().ok(),
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(CkdError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn reconcile_direct(
    encoded: &[(&FieldSpec, Encoded)],
    model_features: &[String],
) -> Result<FeatureVector> {
    let produced: HashMap<&str, FeatureValue> = encoded
        .iter()
        .map(|(spec, e)| {
            let value = match e {
                Encoded::Number(v) => FeatureValue::Number(*v),
                Encoded::Category { code, .. } => FeatureValue::Code(*code),
            };
            (spec.name, value)
        })
        .collect();

    let expected: HashSet<&str> = model_features.iter().map(String::as_str).collect();
    let missing: Vec<String> = model_features
        .iter()
        .filter(|name| !produced.contains_key(name.as_str()))
        .cloned()
        .collect();
    let unexpected: Vec<String> = encoded
        .iter()
        .map(|(spec, _)| spec.name)
        .filter(|name| !expected.contains(name))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(CkdError::SchemaMismatch { missing, unexpected });
    }

    let mut out = FeatureVector::with_capacity(model_features.len());
    for name in model_features {
        out.push(name.clone(), produced[name.as_str()]);
    }
    Ok(out)
}

fn reconcile_expand(
    encoded: &[(&FieldSpec, Encoded)],
    model_features: &[String],
) -> Result<FeatureVector> {
    let expected: HashSet<&str> = model_features.iter().map(String::as_str).collect();
    let mut produced: HashMap<String, FeatureValue> = HashMap::new();
    let mut unexpected = Vec::new();

    for (spec, e) in encoded {
        let (column, value) = match e {
            Encoded::Number(v) => (spec.name.to_string(), FeatureValue::Number(*v)),
            Encoded::Category { value, .. } => {
                (spec.indicator_column(value), FeatureValue::Code(1))
            }
        };

        if expected.contains(column.as_str()) {
            produced.insert(column, value);
        } else if matches!(e, Encoded::Category { .. })
            && has_indicator_columns(spec, &expected)
        {
            // Reference level of a drop-first encoding: all indicators stay 0.
            debug!("Dropping reference indicator column {}", column);
        } else {
            unexpected.push(column);
        }
    }

    if !unexpected.is_empty() {
        return Err(CkdError::SchemaMismatch {
            missing: Vec::new(),
            unexpected,
        });
    }

    let mut out = FeatureVector::with_capacity(model_features.len());
    let mut backfilled = 0usize;
    for name in model_features {
        match produced.get(name) {
            Some(value) => out.push(name.clone(), *value),
            None => {
                backfilled += 1;
                out.push(name.clone(), FeatureValue::Code(0));
            }
        }
    }
    debug!(
        "Expanded {} fields into {} columns ({} backfilled with 0)",
        encoded.len(),
        out.len(),
        backfilled
    );
    Ok(out)
}

fn has_indicator_columns(spec: &FieldSpec, expected: &HashSet<&str>) -> bool {
    spec.allowed_values
        .iter()
        .any(|v| expected.contains(spec.indicator_column(v).as_str()))
}
