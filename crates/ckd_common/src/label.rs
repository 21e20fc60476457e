//! Class-code interpretation.
//!
//! Classifiers disagree on whether code 0 or code 1 means "has CKD", so the
//! polarity is pinned per model artifact in a [`LabelMap`] and never assumed.

use crate::error::{CkdError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Chronic kidney disease present
    Ckd,
    /// Chronic kidney disease absent
    NotCkd,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ckd => "ckd",
            Label::NotCkd => "notckd",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Class code polarity stored alongside a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    pub ckd: i64,
    pub notckd: i64,
}

impl LabelMap {
    pub fn new(ckd: i64, notckd: i64) -> Result<Self> {
        let map = Self { ckd, notckd };
        map.validate()?;
        Ok(map)
    }

    /// Both codes must be 0 or 1 and distinct
    pub fn validate(&self) -> Result<()> {
        let valid = |c: i64| c == 0 || c == 1;
        if !valid(self.ckd) || !valid(self.notckd) || self.ckd == self.notckd {
            return Err(CkdError::InvalidModel(format!(
                "label map must assign codes 0 and 1 to distinct labels (ckd={}, notckd={})",
                self.ckd, self.notckd
            )));
        }
        Ok(())
    }
}

/// Map a classifier output code to its label.
pub fn interpret(class_code: i64, labels: &LabelMap) -> Result<Label> {
    if class_code == labels.ckd {
        Ok(Label::Ckd)
    } else if class_code == labels.notckd {
        Ok(Label::NotCkd)
    } else {
        Err(CkdError::UnknownClassCode(class_code))
    }
}
