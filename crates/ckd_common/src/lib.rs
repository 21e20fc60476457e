//! CKD Common - feature normalization and model plumbing for the chronic
//! kidney disease classifier.
//!
//! Raw form input flows through [`normalizer::normalize`] into a
//! [`FeatureVector`] aligned to the model's columns, the model produces a
//! class code, and [`label::interpret`] maps it to a [`Label`].

pub mod cache;
pub mod config;
pub mod encoding;
pub mod error;
pub mod features;
pub mod label;
pub mod loader;
pub mod model;
pub mod normalizer;
pub mod predictor;
pub mod schema;

pub use config::{CkdConfig, ModelEntry};
pub use encoding::EncodingTable;
pub use error::{CkdError, Result};
pub use features::{FeatureValue, FeatureVector};
pub use label::{interpret, Label, LabelMap};
pub use loader::{ModelLoader, ModelSource};
pub use model::{Classifier, DecisionTree, LoadedModel, ModelBundle, ModelSchema, TreeNode};
pub use normalizer::{normalize, RawInput, RawValue, ReconciliationPolicy};
pub use predictor::{Prediction, Predictor};
pub use schema::{FieldKind, FieldSpec, SchemaVariant};
