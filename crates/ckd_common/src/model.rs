//! Model artifacts.
//!
//! A model artifact is a JSON bundle carrying the classifier together with
//! everything needed to feed it: the schema it was trained on (variant,
//! reconciliation policy, ordered feature names), the class-code polarity
//! and optionally its own encoding table. The bundle is validated once at
//! load time; a [`LoadedModel`] is immutable afterwards.

use crate::encoding::EncodingTable;
use crate::error::{CkdError, Result};
use crate::features::FeatureVector;
use crate::label::LabelMap;
use crate::normalizer::ReconciliationPolicy;
use crate::schema::{FieldKind, SchemaVariant};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Anything that maps one positional feature row to a class code
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<i64>;

    /// Classifier type identifier
    fn kind(&self) -> &str;
}

/// Decision tree node, sklearn layout: `row[feature] <= threshold` goes left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: i64,
    },
}

/// Flattened decision tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Children must come after their parent, which rules out cycles.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CkdError::InvalidModel("decision tree has no nodes".to_string()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(CkdError::InvalidModel(format!(
                            "node {} splits on feature {} but the schema has {} features",
                            idx, feature, n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(CkdError::InvalidModel(format!(
                            "node {} has a non-finite threshold",
                            idx
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(CkdError::InvalidModel(format!(
                                "node {} has invalid child index {}",
                                idx, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    /// Every class code some leaf can produce
    pub fn classes(&self) -> Vec<i64> {
        let mut classes: Vec<i64> = self
            .nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Leaf { class } => Some(*class),
                TreeNode::Split { .. } => None,
            })
            .collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, row: &[f64]) -> Result<i64> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { class }) => return Ok(*class),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        CkdError::InvalidModel(format!(
                            "row has {} features, tree needs feature {}",
                            row.len(),
                            feature
                        ))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(CkdError::InvalidModel(format!(
            "tree traversal did not reach a leaf (stopped at node {})",
            idx
        )))
    }

    fn kind(&self) -> &str {
        "decision_tree"
    }
}

/// Columns a model was trained on and how to produce them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub variant: SchemaVariant,
    pub policy: ReconciliationPolicy,
    pub feature_names: Vec<String>,
}

impl ModelSchema {
    /// Names must be unique and each must be producible from the variant's
    /// fields under the schema's policy. Under `Expand`, an indicator for a
    /// category the form does not offer (e.g. `appet_none`) is accepted and
    /// always backfilled with 0.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(CkdError::InvalidModel("schema has no feature names".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return Err(CkdError::InvalidModel(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        let producible: HashSet<String> = self
            .variant
            .fields()
            .iter()
            .flat_map(|spec| match (self.policy, spec.kind) {
                (ReconciliationPolicy::Expand, FieldKind::Categorical) => spec
                    .allowed_values
                    .iter()
                    .map(|v| spec.indicator_column(v))
                    .collect::<Vec<_>>(),
                _ => vec![spec.name.to_string()],
            })
            .collect();

        if let Some(unknown) = self
            .feature_names
            .iter()
            .find(|n| !producible.contains(*n) && !self.is_unoffered_indicator(n))
        {
            return Err(CkdError::InvalidModel(format!(
                "feature '{}' cannot be produced from the {} schema under the {} policy",
                unknown, self.variant, self.policy
            )));
        }

        let present: HashSet<&str> = self.feature_names.iter().map(String::as_str).collect();
        for spec in self.variant.fields() {
            let covered = match (self.policy, spec.kind) {
                (ReconciliationPolicy::Expand, FieldKind::Categorical) => spec
                    .allowed_values
                    .iter()
                    .any(|v| present.contains(spec.indicator_column(v).as_str())),
                _ => present.contains(spec.name),
            };
            if !covered {
                return Err(CkdError::InvalidModel(format!(
                    "field '{}' has no column in the model schema",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    fn is_unoffered_indicator(&self, name: &str) -> bool {
        self.policy == ReconciliationPolicy::Expand
            && self
                .variant
                .fields()
                .iter()
                .filter(|spec| spec.is_categorical())
                .any(|spec| {
                    name.strip_prefix(spec.name)
                        .and_then(|rest| rest.strip_prefix('_'))
                        .is_some_and(|category| !category.is_empty())
                })
    }
}

/// On-disk / over-the-wire model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema: ModelSchema,
    pub labels: LabelMap,
    /// Overrides the built-in label encoding for this artifact
    #[serde(default)]
    pub encoding: Option<EncodingTable>,
    pub tree: DecisionTree,
}

impl ModelBundle {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CkdError::InvalidModel(format!("failed to parse artifact: {}", e)))
    }

    pub fn into_model(self) -> Result<LoadedModel> {
        self.tree.validate(self.schema.feature_names.len())?;
        let unmapped: Vec<i64> = self
            .tree
            .classes()
            .into_iter()
            .filter(|c| *c != self.labels.ckd && *c != self.labels.notckd)
            .collect();
        if !unmapped.is_empty() {
            return Err(CkdError::InvalidModel(format!(
                "tree leaves produce class codes {:?} with no label",
                unmapped
            )));
        }

        LoadedModel::new(
            self.name,
            self.description,
            self.schema,
            self.labels,
            self.encoding,
            Box::new(self.tree),
        )
    }
}

/// A validated, ready-to-use model
pub struct LoadedModel {
    name: String,
    description: String,
    schema: ModelSchema,
    labels: LabelMap,
    encoding: EncodingTable,
    classifier: Box<dyn Classifier>,
    /// Hex SHA-256 of the artifact bytes, when loaded from an artifact
    sha256: Option<String>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("labels", &self.labels)
            .field("classifier", &self.classifier.kind())
            .field("sha256", &self.sha256)
            .finish()
    }
}

impl LoadedModel {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ModelSchema,
        labels: LabelMap,
        encoding: Option<EncodingTable>,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self> {
        schema.validate()?;
        labels.validate()?;

        let specs = schema.variant.fields();
        let encoding = encoding.unwrap_or_else(|| EncodingTable::label_encoded(specs));
        encoding.validate(specs)?;

        Ok(Self {
            name: name.into(),
            description: description.into(),
            schema,
            labels,
            encoding,
            classifier,
            sha256: None,
        })
    }

    pub(crate) fn with_sha256(mut self, digest: String) -> Self {
        self.sha256 = Some(digest);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn feature_names(&self) -> &[String] {
        &self.schema.feature_names
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn encoding(&self) -> &EncodingTable {
        &self.encoding
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    pub fn classifier_kind(&self) -> &str {
        self.classifier.kind()
    }

    /// Run the classifier on a vector that must already be in model order
    pub fn predict(&self, features: &FeatureVector) -> Result<i64> {
        if !features.names().eq(self.feature_names().iter().map(String::as_str)) {
            let expected: HashSet<&str> = self.feature_names().iter().map(String::as_str).collect();
            let got: HashSet<&str> = features.names().collect();
            return Err(CkdError::SchemaMismatch {
                missing: self
                    .feature_names()
                    .iter()
                    .filter(|n| !got.contains(n.as_str()))
                    .cloned()
                    .collect(),
                unexpected: features
                    .names()
                    .filter(|n| !expected.contains(n))
                    .map(str::to_string)
                    .collect(),
            });
        }
        self.classifier.predict(&features.to_row())
    }
}
