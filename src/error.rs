//! Error types for the tax rule engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure that can occur while loading rule packs or computing tax.

use std::fmt;

use thiserror::Error;

/// A single defect found while validating a rule pack.
///
/// The `path` points at the offending field, e.g. `taxBrackets[2].min`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the offending field.
    pub path: String,
    /// Human-readable description of the defect.
    pub message: String,
}

impl ValidationIssue {
    /// Creates a new issue at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.path, self.message)
        }
    }
}

/// Every issue found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationIssues {
    issues: Vec<ValidationIssue>,
}

impl ValidationIssues {
    /// Wraps a list of issues.
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Returns the number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if there are no issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns a slice of all issues.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// Returns true if any issue sits at exactly `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// The main error type for the tax rule engine.
///
/// # Example
///
/// ```
/// use tax_rule_engine::error::EngineError;
///
/// let error = EngineError::RulePackMissing {
///     year: 2023,
///     path: "config/tax-rules/2023.json".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Rule pack for tax year 2023 is missing: config/tax-rules/2023.json"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule pack failed structural or invariant validation.
    #[error("Rule pack '{source_name}' failed validation with {} issue(s):\n{issues}", .issues.len())]
    SchemaViolation {
        /// The file or label the pack was read from.
        source_name: String,
        /// Every issue found, in discovery order.
        issues: ValidationIssues,
    },

    /// The built-in rule pack schema could not be compiled.
    #[error("Rule pack schema is invalid: {message}")]
    RulePackSchemaInvalid {
        /// The schema compiler's description of the failure.
        message: String,
    },

    /// No rule pack file exists for the requested year.
    #[error("Rule pack for tax year {year} is missing: {path}")]
    RulePackMissing {
        /// The requested tax year.
        year: i32,
        /// The path that was probed.
        path: String,
    },

    /// The rule pack file could not be parsed.
    #[error("Failed to parse rule pack '{path}': {message}")]
    RulePackParse {
        /// The path of the file that failed to parse.
        path: String,
        /// The parser's description of the failure.
        message: String,
    },

    /// The rule pack declares a different year than the one it was requested under.
    #[error("Rule pack '{path}' declares year {found} but was requested for {requested}")]
    RulePackYearMismatch {
        /// The year the caller asked for.
        requested: i32,
        /// The year written in the file.
        found: i32,
        /// The path of the offending file.
        path: String,
    },

    /// The rule pack directory could not be read.
    #[error("Failed to read rule pack location '{path}': {message}")]
    RulePackIo {
        /// The path being read.
        path: String,
        /// The underlying I/O error message.
        message: String,
    },

    /// None of the candidate configuration roots contain a rule pack directory.
    #[error("No tax rule directory found; tried: {}", .candidates.join(", "))]
    ConfigRootNotFound {
        /// Every candidate directory that was probed, in order.
        candidates: Vec<String>,
    },

    /// An operation was refused because the year's rule pack is not usable.
    #[error("Cannot {operation} for tax year {year}: rule pack status is '{state}' ({message})")]
    OperationBlocked {
        /// The operation that was blocked, e.g. "calculate tax".
        operation: String,
        /// The tax year in question.
        year: i32,
        /// The status state name.
        state: String,
        /// The status checker's diagnostic message.
        message: String,
    },

    /// The calculator was invoked with inputs that break its contract.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns true if this error means the rule pack does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            EngineError::RulePackMissing { .. } | EngineError::ConfigRootNotFound { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_pack_missing_displays_year_and_path() {
        let error = EngineError::RulePackMissing {
            year: 2022,
            path: "/rules/2022.json".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Rule pack for tax year 2022 is missing: /rules/2022.json"
        );
        assert!(error.is_missing());
    }

    #[test]
    fn test_year_mismatch_displays_both_years() {
        let error = EngineError::RulePackYearMismatch {
            requested: 2025,
            found: 2024,
            path: "/rules/2025.json".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Rule pack '/rules/2025.json' declares year 2024 but was requested for 2025"
        );
        assert!(!error.is_missing());
    }

    #[test]
    fn test_config_root_not_found_lists_every_candidate() {
        let error = EngineError::ConfigRootNotFound {
            candidates: vec!["/a/config".to_string(), "/b/config".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "No tax rule directory found; tried: /a/config, /b/config"
        );
    }

    #[test]
    fn test_schema_violation_lists_all_issues() {
        let error = EngineError::SchemaViolation {
            source_name: "2024.json".to_string(),
            issues: ValidationIssues::new(vec![
                ValidationIssue::new("taxBrackets[0].min", "first bracket must start at 0"),
                ValidationIssue::new("medical.defaultRate", "rate must be within [0, 1]"),
            ]),
        };
        let text = error.to_string();
        assert!(text.starts_with("Rule pack '2024.json' failed validation with 2 issue(s):"));
        assert!(text.contains("  taxBrackets[0].min: first bracket must start at 0"));
        assert!(text.contains("  medical.defaultRate: rate must be within [0, 1]"));
    }

    #[test]
    fn test_operation_blocked_names_year_state_and_operation() {
        let error = EngineError::OperationBlocked {
            operation: "calculate tax".to_string(),
            year: 2024,
            state: "stale".to_string(),
            message: "verified 70 days ago".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Cannot calculate tax for tax year 2024: rule pack status is 'stale' (verified 70 days ago)"
        );
    }

    #[test]
    fn test_root_issue_displays_as_root() {
        let issue = ValidationIssue::new("", "expected an object");
        assert_eq!(issue.to_string(), "  (root): expected an object");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_missing() -> EngineResult<()> {
            Err(EngineError::RulePackMissing {
                year: 2020,
                path: "/test".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_missing()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
