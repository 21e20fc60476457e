//! Categorical encoding table.
//!
//! Maps each categorical field to a value -> integer code table. The
//! built-in table reproduces the label encoding the classifiers were
//! trained with: allowed values sorted lexicographically, codes 0, 1, ...

use crate::error::{CkdError, Result};
use crate::schema::FieldSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodingTable {
    fields: BTreeMap<String, BTreeMap<String, i64>>,
}

impl EncodingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label encoding for every categorical field in `specs`
    pub fn label_encoded(specs: &[FieldSpec]) -> Self {
        let mut table = Self::new();
        for spec in specs.iter().filter(|s| s.is_categorical()) {
            let mut values: Vec<&str> = spec.allowed_values.to_vec();
            values.sort_unstable();
            let codes = values
                .into_iter()
                .enumerate()
                .map(|(code, value)| (value.to_string(), code as i64))
                .collect();
            table.fields.insert(spec.name.to_string(), codes);
        }
        table
    }

    /// Add or replace the code for one value
    pub fn with_code(mut self, field: &str, value: &str, code: i64) -> Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .insert(value.to_string(), code);
        self
    }

    pub fn code(&self, field: &str, value: &str) -> Option<i64> {
        self.fields.get(field).and_then(|codes| codes.get(value)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check the table covers exactly the allowed values of every
    /// categorical field and that no two values of one field share a code.
    pub fn validate(&self, specs: &[FieldSpec]) -> Result<()> {
        for field in self.fields.keys() {
            if !specs.iter().any(|s| s.is_categorical() && s.name == field.as_str()) {
                return Err(CkdError::InvalidModel(format!(
                    "encoding table has an entry for '{}', which is not a categorical field",
                    field
                )));
            }
        }

        for spec in specs.iter().filter(|s| s.is_categorical()) {
            let codes = self.fields.get(spec.name).ok_or_else(|| {
                CkdError::InvalidModel(format!(
                    "encoding table has no entry for categorical field '{}'",
                    spec.name
                ))
            })?;

            for value in spec.allowed_values {
                if !codes.contains_key(*value) {
                    return Err(CkdError::InvalidModel(format!(
                        "encoding table for '{}' has no code for allowed value '{}'",
                        spec.name, value
                    )));
                }
            }

            if let Some(extra) = codes
                .keys()
                .find(|v| !spec.allowed_values.iter().any(|a| *a == v.as_str()))
            {
                return Err(CkdError::InvalidModel(format!(
                    "encoding table for '{}' has a code for '{}', which is not an allowed value",
                    spec.name, extra
                )));
            }

            let mut seen = HashSet::new();
            for (value, code) in codes {
                if !seen.insert(*code) {
                    return Err(CkdError::InvalidModel(format!(
                        "encoding table for '{}' reuses code {} (value '{}')",
                        spec.name, code, value
                    )));
                }
            }
        }
        Ok(())
    }
}
