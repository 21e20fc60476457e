//! Clinical field definitions.
//!
//! Two form layouts exist: a reduced numeric-only set of 14 fields and the
//! full 24-field set that adds 10 categorical fields. Both are static and
//! read-only for the life of the process.

use serde::{Deserialize, Serialize};

/// Field typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// One clinical field collected by the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Unique key (e.g. "age", "rbc")
    pub name: &'static str,
    pub kind: FieldKind,
    /// Display-only unit
    pub unit: &'static str,
    /// Ordered allowed values; empty for numeric fields
    pub allowed_values: &'static [&'static str],
}

impl FieldSpec {
    pub const fn numeric(name: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric,
            unit,
            allowed_values: &[],
        }
    }

    pub const fn categorical(name: &'static str, allowed_values: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Categorical,
            unit: "",
            allowed_values,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FieldKind::Categorical
    }

    /// Indicator column name for one category under one-hot expansion
    pub fn indicator_column(&self, value: &str) -> String {
        format!("{}_{}", self.name, value)
    }
}

const NORMALITY: &[&str] = &["normal", "abnormal"];
const PRESENCE: &[&str] = &["present", "notpresent"];
const YES_NO: &[&str] = &["yes", "no"];
const APPETITE: &[&str] = &["good", "poor"];

static REDUCED_FIELDS: [FieldSpec; 14] = [
    FieldSpec::numeric("age", "years"),
    FieldSpec::numeric("bp", "mm/Hg"),
    FieldSpec::numeric("sg", ""),
    FieldSpec::numeric("al", ""),
    FieldSpec::numeric("su", ""),
    FieldSpec::numeric("bgr", "mgs/dl"),
    FieldSpec::numeric("bu", "mgs/dl"),
    FieldSpec::numeric("sc", "mgs/dl"),
    FieldSpec::numeric("sod", "mEq/L"),
    FieldSpec::numeric("pot", "mEq/L"),
    FieldSpec::numeric("hemo", "gms"),
    FieldSpec::numeric("pcv", "%"),
    FieldSpec::numeric("wbcc", "cells/cumm"),
    FieldSpec::numeric("rbcc", "millions/cmm"),
];

static FULL_FIELDS: [FieldSpec; 24] = [
    FieldSpec::numeric("age", "years"),
    FieldSpec::numeric("bp", "mm/Hg"),
    FieldSpec::numeric("sg", ""),
    FieldSpec::numeric("al", ""),
    FieldSpec::numeric("su", ""),
    FieldSpec::categorical("rbc", NORMALITY),
    FieldSpec::categorical("pc", NORMALITY),
    FieldSpec::categorical("pcc", PRESENCE),
    FieldSpec::categorical("ba", PRESENCE),
    FieldSpec::numeric("bgr", "mgs/dl"),
    FieldSpec::numeric("bu", "mgs/dl"),
    FieldSpec::numeric("sc", "mgs/dl"),
    FieldSpec::numeric("sod", "mEq/L"),
    FieldSpec::numeric("pot", "mEq/L"),
    FieldSpec::numeric("hemo", "gms"),
    FieldSpec::numeric("pcv", "%"),
    FieldSpec::numeric("wbcc", "cells/cumm"),
    FieldSpec::numeric("rbcc", "millions/cmm"),
    FieldSpec::categorical("htn", YES_NO),
    FieldSpec::categorical("dm", YES_NO),
    FieldSpec::categorical("cad", YES_NO),
    FieldSpec::categorical("appet", APPETITE),
    FieldSpec::categorical("pe", YES_NO),
    FieldSpec::categorical("ane", YES_NO),
];

/// Which form layout a model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// 14 numeric fields
    Reduced,
    /// 24 fields, 10 of them categorical
    Full,
}

impl SchemaVariant {
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Reduced => &REDUCED_FIELDS,
            Self::Full => &FULL_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reduced => "reduced",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reduced" => Ok(Self::Reduced),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown schema variant '{}'", other)),
        }
    }
}
