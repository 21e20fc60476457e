//! Raw form input for ckdctl.
//!
//! A submission comes from a JSON object (file or stdin) and/or repeated
//! `--set name=value` flags; flags override file values.

use anyhow::{bail, Context, Result};
use ckd_common::{RawInput, RawValue};
use std::io::Read;
use std::path::Path;

/// Split a `name=value` argument; the name is trimmed and must be non-empty
pub fn split_pair(arg: &str) -> Result<(&str, &str)> {
    let (name, value) = arg
        .split_once('=')
        .with_context(|| format!("expected name=value, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("empty name in '{}'", arg);
    }
    Ok((name, value))
}

/// Parse one `--set name=value` field assignment
pub fn parse_assignment(arg: &str) -> Result<(String, RawValue)> {
    let (name, value) = split_pair(arg)?;
    Ok((name.to_string(), RawValue::Text(value.to_string())))
}

/// Parse a JSON object of field name -> string | number
pub fn parse_json(text: &str) -> Result<RawInput> {
    serde_json::from_str(text).context("input must be a JSON object of field name to string or number")
}

/// Read a JSON submission from a file, or stdin when the path is "-"
pub fn read_json(path: &Path) -> Result<RawInput> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    parse_json(&text).with_context(|| format!("Invalid input in {}", path.display()))
}

/// Merge a file submission with `--set` overrides
pub fn collect(file: Option<&Path>, assignments: &[String]) -> Result<RawInput> {
    let mut raw = match file {
        Some(path) => read_json(path)?,
        None => RawInput::new(),
    };
    for arg in assignments {
        let (name, value) = parse_assignment(arg)?;
        raw.insert(name, value);
    }
    if raw.is_empty() {
        bail!("no input given; use --input FILE or --set name=value");
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (name, value) = parse_assignment("age=45").unwrap();
        assert_eq!(name, "age");
        assert_eq!(value, RawValue::Text("45".to_string()));

        let (_, value) = parse_assignment("note=a=b").unwrap();
        assert_eq!(value, RawValue::Text("a=b".to_string()));

        assert!(parse_assignment("age").is_err());
        assert!(parse_assignment("=45").is_err());
    }

    #[test]
    fn test_split_pair_trims_name() {
        assert_eq!(split_pair(" tree =models/tree.json").unwrap(), ("tree", "models/tree.json"));
        assert!(split_pair(" =x").is_err());
    }

    #[test]
    fn test_parse_json_mixed_values() {
        let raw = parse_json(r#"{"age": 45, "rbc": "normal", "sg": "1.02"}"#).unwrap();
        assert_eq!(raw["age"], RawValue::Number(45.0));
        assert_eq!(raw["rbc"], RawValue::Text("normal".to_string()));
        assert_eq!(raw["sg"], RawValue::Text("1.02".to_string()));
    }

    #[test]
    fn test_parse_json_rejects_non_object() {
        assert!(parse_json("[1, 2]").is_err());
        assert!(parse_json(r#"{"age": true}"#).is_err());
    }

    #[test]
    fn test_collect_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"age": "45", "bp": "80"}"#).unwrap();

        let raw = collect(Some(&path), &["age=50".to_string()]).unwrap();
        assert_eq!(raw["age"], RawValue::Text("50".to_string()));
        assert_eq!(raw["bp"], RawValue::Text("80".to_string()));
    }

    #[test]
    fn test_collect_requires_input() {
        assert!(collect(None, &[]).is_err());
    }
}
