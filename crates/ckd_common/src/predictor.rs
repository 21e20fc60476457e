//! End-to-end prediction: normalize, classify, interpret.

use crate::error::{CkdError, Result};
use crate::features::FeatureVector;
use crate::label::{interpret, Label};
use crate::model::LoadedModel;
use crate::normalizer::{self, RawInput};
use crate::schema::FieldSpec;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one prediction request
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub model: String,
    pub class_code: i64,
    pub label: Label,
    pub features: FeatureVector,
}

/// Binds a loaded model to its form fields and encoding table
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<LoadedModel>,
}

impl Predictor {
    pub fn new(model: Arc<LoadedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    /// Fields the form must collect for this model
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.model.schema().variant.fields()
    }

    /// All field-level problems in a submission, empty when it is valid
    pub fn validate(&self, raw: &RawInput) -> Vec<CkdError> {
        normalizer::validate(raw, self.fields(), self.model.encoding())
    }

    pub fn normalize(&self, raw: &RawInput) -> Result<FeatureVector> {
        let schema = self.model.schema();
        normalizer::normalize(
            raw,
            self.fields(),
            self.model.encoding(),
            &schema.feature_names,
            schema.policy,
        )
    }

    pub fn predict(&self, raw: &RawInput) -> Result<Prediction> {
        let features = self.normalize(raw)?;
        let class_code = self.model.predict(&features)?;
        let label = interpret(class_code, self.model.labels())?;
        debug!(
            "Model '{}' predicted class {} ({})",
            self.model.name(),
            class_code,
            label
        );

        Ok(Prediction {
            model: self.model.name().to_string(),
            class_code,
            label,
            features,
        })
    }
}
