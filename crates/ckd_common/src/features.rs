//! Model-ready feature vectors.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One cell of a feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    /// Coerced numeric field
    Number(f64),
    /// Encoded category or 0/1 indicator
    Code(i64),
}

impl FeatureValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Number(v) => *v,
            FeatureValue::Code(c) => *c as f64,
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Number(v) => serializer.serialize_f64(*v),
            FeatureValue::Code(c) => serializer.serialize_i64(*c),
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Code(c) => write!(f, "{}", c),
        }
    }
}

/// Ordered feature name -> value pairs for exactly one patient record.
/// Serializes as a JSON object in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.columns.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Positional row as consumed by the classifier
    pub fn to_row(&self) -> Vec<f64> {
        self.columns.iter().map(|(_, v)| v.as_f64()).collect()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
