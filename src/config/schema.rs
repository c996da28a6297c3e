//! JSON Schema for rule pack documents.
//!
//! The schema is compiled once and reports every type and presence defect
//! in a document, each with the path of the offending field.

use std::sync::LazyLock;

use jsonschema::error::ValidationErrorKind;
use serde_json::Value;

use crate::error::{EngineError, EngineResult, ValidationIssue};

const RULE_PACK_SCHEMA: &str = include_str!("../../config/schema/tax-rule-pack.schema.json");

static VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(RULE_PACK_SCHEMA).map_err(|e| e.to_string())?;
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft202012)
        .build(&schema)
        .map_err(|e| e.to_string())
});

/// Checks `raw` against the rule pack schema and returns every violation.
///
/// An empty list means the document has the right shape for deserialization.
pub fn schema_issues(raw: &Value) -> EngineResult<Vec<ValidationIssue>> {
    let validator = VALIDATOR
        .as_ref()
        .map_err(|message| EngineError::RulePackSchemaInvalid {
            message: message.clone(),
        })?;

    let issues = validator
        .iter_errors(raw)
        .map(|err| {
            let mut path = pointer_to_path(&err.instance_path.to_string());
            // Missing fields are reported on their parent object.
            if let ValidationErrorKind::Required { property } = &err.kind {
                if let Some(name) = property.as_str() {
                    push_field(&mut path, name);
                }
            }
            ValidationIssue::new(path, err.to_string())
        })
        .collect();

    Ok(issues)
}

/// Turns a JSON pointer (`/taxBrackets/2/rate`) into a field path
/// (`taxBrackets[2].rate`).
fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();

    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if segment.parse::<usize>().is_ok() {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            push_field(&mut path, &segment);
        }
    }

    path
}

fn push_field(path: &mut String, name: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PACK_2024: &str = include_str!("../../config/tax-rules/2024.json");

    fn valid_raw() -> Value {
        serde_json::from_str(PACK_2024).unwrap()
    }

    #[test]
    fn test_pointer_to_path() {
        assert_eq!(pointer_to_path(""), "");
        assert_eq!(pointer_to_path("/homeOffice/maxDays"), "homeOffice.maxDays");
        assert_eq!(pointer_to_path("/taxBrackets/2/rate"), "taxBrackets[2].rate");
        assert_eq!(
            pointer_to_path("/pendlerpauschale/gross/0/minKm"),
            "pendlerpauschale.gross[0].minKm"
        );
    }

    #[test]
    fn test_shipped_pack_has_no_schema_issues() {
        let issues = schema_issues(&valid_raw()).unwrap();
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_numeric_strings_are_accepted_for_amounts() {
        let mut raw = valid_raw();
        raw["credits"]["churchTaxMax"] = json!("600.00");

        let issues = schema_issues(&raw).unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_every_type_error_is_reported_with_its_path() {
        let mut raw = valid_raw();
        raw["homeOffice"]["maxDays"] = json!("a hundred");
        raw["taxBrackets"][2]["rate"] = json!("high");

        let issues = schema_issues(&raw).unwrap();

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.path == "homeOffice.maxDays"));
        assert!(issues.iter().any(|i| i.path == "taxBrackets[2].rate"));
    }

    #[test]
    fn test_missing_field_is_reported_at_the_field() {
        let mut raw = valid_raw();
        raw["medical"].as_object_mut().unwrap().remove("disabilityRate");
        raw.as_object_mut().unwrap().remove("version");

        let issues = schema_issues(&raw).unwrap();

        assert!(issues.iter().any(|i| i.path == "medical.disabilityRate"));
        assert!(issues.iter().any(|i| i.path == "version"));
    }
}
