//! Rule pack validation.
//!
//! Validation runs in two phases: a structural phase that checks the raw
//! document against the rule pack JSON Schema (field presence and types),
//! and an invariant phase that checks ranges and cross-field continuity on
//! the deserialized [`RulePackDocument`]. Each phase collects every issue
//! before reporting, so a single call surfaces every defect of that kind in
//! a hand-edited pack.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult, ValidationIssue, ValidationIssues};

use super::schema::schema_issues;
use super::types::{
    CreditRules, PendlerBracket, RulePackDocument, TaxBracket, TaxRulePack, TieredFamilyCredit,
};

/// Allowed range for `staleAfterDays`.
const STALE_AFTER_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=365;

/// Validates a rule pack held as a JSON value.
///
/// `source_name` labels the pack in the returned error (usually the file path).
///
/// # Example
///
/// ```
/// use tax_rule_engine::config::validate_value;
///
/// let raw = serde_json::json!({ "year": 2024 });
/// let err = validate_value(raw, "inline").unwrap_err();
/// assert!(err.to_string().contains("failed validation"));
/// ```
pub fn validate_value(raw: serde_json::Value, source_name: &str) -> EngineResult<TaxRulePack> {
    let issues = schema_issues(&raw)?;
    if !issues.is_empty() {
        return Err(EngineError::SchemaViolation {
            source_name: source_name.to_string(),
            issues: ValidationIssues::new(issues),
        });
    }

    // The schema admits a few values serde still refuses, e.g. decimals
    // beyond 96 bits.
    let document: RulePackDocument =
        serde_json::from_value(raw).map_err(|e| EngineError::SchemaViolation {
            source_name: source_name.to_string(),
            issues: ValidationIssues::new(vec![ValidationIssue::new("", e.to_string())]),
        })?;

    validate_document(document, source_name)
}

/// Parses and validates a rule pack held as a JSON string.
pub fn validate_str(json: &str, source_name: &str) -> EngineResult<TaxRulePack> {
    let raw: serde_json::Value =
        serde_json::from_str(json).map_err(|e| EngineError::RulePackParse {
            path: source_name.to_string(),
            message: e.to_string(),
        })?;

    validate_value(raw, source_name)
}

/// Runs the invariant checks on an already deserialized document.
pub fn validate_document(
    document: RulePackDocument,
    source_name: &str,
) -> EngineResult<TaxRulePack> {
    let issues = collect_issues(&document);

    if !issues.is_empty() {
        return Err(EngineError::SchemaViolation {
            source_name: source_name.to_string(),
            issues: ValidationIssues::new(issues),
        });
    }

    Ok(TaxRulePack::from_validated(document))
}

/// Collects every invariant violation in `document`.
fn collect_issues(document: &RulePackDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if document.version.trim().is_empty() {
        issues.push(ValidationIssue::new("version", "must not be empty"));
    }

    if let Some(days) = document.stale_after_days {
        if !STALE_AFTER_DAYS_RANGE.contains(&days) {
            issues.push(ValidationIssue::new(
                "staleAfterDays",
                format!("must be between 1 and 365, got {}", days),
            ));
        }
    }

    check_sources(&document.metadata.sources, &mut issues);
    check_brackets(&document.tax_brackets, &mut issues);
    check_credits(&document.credits, &mut issues);

    let home_office = &document.home_office;
    check_amount("homeOffice.perDay", home_office.per_day, &mut issues);
    check_amount("homeOffice.maxAmount", home_office.max_amount, &mut issues);

    let childcare = &document.childcare;
    check_amount("childcare.maxPerChild", childcare.max_per_child, &mut issues);
    check_rate(
        "childcare.sharedCustodyFactor",
        childcare.shared_custody_factor,
        &mut issues,
    );

    let medical = &document.medical;
    check_rate("medical.defaultRate", medical.default_rate, &mut issues);
    check_rate(
        "medical.manyChildrenRate",
        medical.many_children_rate,
        &mut issues,
    );
    check_rate(
        "medical.singleTwoChildrenRate",
        medical.single_two_children_rate,
        &mut issues,
    );
    check_rate(
        "medical.singleThreeOrMoreChildrenRate",
        medical.single_three_or_more_children_rate,
        &mut issues,
    );
    check_rate("medical.disabilityRate", medical.disability_rate, &mut issues);

    check_pendler_table(
        "pendlerpauschale.klein",
        &document.pendlerpauschale.klein,
        &mut issues,
    );
    check_pendler_table(
        "pendlerpauschale.gross",
        &document.pendlerpauschale.gross,
        &mut issues,
    );

    issues
}

fn check_sources(sources: &[String], issues: &mut Vec<ValidationIssue>) {
    if sources.is_empty() {
        issues.push(ValidationIssue::new(
            "metadata.sources",
            "at least one source URL is required",
        ));
    }

    for (i, source) in sources.iter().enumerate() {
        if !(source.starts_with("https://") || source.starts_with("http://")) {
            issues.push(ValidationIssue::new(
                format!("metadata.sources[{}]", i),
                format!("'{}' is not an http(s) URL", source),
            ));
        }
    }
}

fn check_brackets(brackets: &[TaxBracket], issues: &mut Vec<ValidationIssue>) {
    if brackets.len() < 2 {
        issues.push(ValidationIssue::new(
            "taxBrackets",
            format!("at least 2 brackets are required, got {}", brackets.len()),
        ));
    }

    if let Some(first) = brackets.first() {
        if !first.min.is_zero() {
            issues.push(ValidationIssue::new(
                "taxBrackets[0].min",
                format!("first bracket must start at 0, got {}", first.min),
            ));
        }
    }

    for (i, bracket) in brackets.iter().enumerate() {
        let path = format!("taxBrackets[{}]", i);
        check_rate(&format!("{}.rate", path), bracket.rate, issues);

        if bracket.max.is_some_and(|max| max <= bracket.min) {
            issues.push(ValidationIssue::new(
                format!("{}.max", path),
                format!("must be greater than min {}", bracket.min),
            ));
        }

        if i == 0 {
            continue;
        }

        match brackets[i - 1].max {
            Some(prev_max) if prev_max != bracket.min => {
                issues.push(ValidationIssue::new(
                    format!("{}.min", path),
                    format!(
                        "must equal the previous bracket's max {}, got {}",
                        prev_max, bracket.min
                    ),
                ));
            }
            Some(_) => {}
            None => {
                issues.push(ValidationIssue::new(
                    format!("taxBrackets[{}].max", i - 1),
                    "only the last bracket may be open-ended",
                ));
            }
        }
    }
}

fn check_pendler_table(table: &str, bands: &[PendlerBracket], issues: &mut Vec<ValidationIssue>) {
    if bands.is_empty() {
        issues.push(ValidationIssue::new(
            table,
            "table must contain at least one distance band",
        ));
        return;
    }

    for (i, band) in bands.iter().enumerate() {
        let path = format!("{}[{}]", table, i);

        if band.min_km < Decimal::ZERO {
            issues.push(ValidationIssue::new(
                format!("{}.minKm", path),
                format!("must not be negative, got {}", band.min_km),
            ));
        }
        check_amount(&format!("{}.amount", path), band.amount, issues);

        if band.max_km.is_some_and(|max_km| max_km <= band.min_km) {
            issues.push(ValidationIssue::new(
                format!("{}.maxKm", path),
                format!("must be greater than minKm {}", band.min_km),
            ));
        }

        if i == 0 {
            continue;
        }

        match bands[i - 1].max_km {
            Some(prev_max) if prev_max != band.min_km => {
                issues.push(ValidationIssue::new(
                    format!("{}.minKm", path),
                    format!(
                        "must equal the previous band's maxKm {}, got {}",
                        prev_max, band.min_km
                    ),
                ));
            }
            Some(_) => {}
            None => {
                issues.push(ValidationIssue::new(
                    format!("{}[{}].maxKm", table, i - 1),
                    "only the last band may be open-ended",
                ));
            }
        }
    }
}

fn check_credits(credits: &CreditRules, issues: &mut Vec<ValidationIssue>) {
    let flat = [
        ("werbungskostenPauschale", credits.werbungskosten_pauschale),
        ("verkehrsabsetzbetrag", credits.verkehrsabsetzbetrag),
        ("arbeitnehmerabsetzbetrag", credits.arbeitnehmerabsetzbetrag),
        ("churchTaxMax", credits.church_tax_max),
        ("familienbonusPerChild", credits.familienbonus_per_child),
        (
            "familienbonusPerChildAdult",
            credits.familienbonus_per_child_adult,
        ),
    ];

    for (name, amount) in flat {
        check_amount(&format!("credits.{}", name), amount, issues);
    }

    check_tiered("credits.alleinverdiener", &credits.alleinverdiener, issues);
    check_tiered("credits.alleinerzieher", &credits.alleinerzieher, issues);
}

fn check_tiered(path: &str, credit: &TieredFamilyCredit, issues: &mut Vec<ValidationIssue>) {
    check_amount(&format!("{}.firstChild", path), credit.first_child, issues);
    check_amount(
        &format!("{}.secondChildIncrement", path),
        credit.second_child_increment,
        issues,
    );
    check_amount(
        &format!("{}.additionalChildIncrement", path),
        credit.additional_child_increment,
        issues,
    );
}

fn check_amount(path: &str, amount: Decimal, issues: &mut Vec<ValidationIssue>) {
    if amount < Decimal::ZERO {
        issues.push(ValidationIssue::new(
            path,
            format!("amount must not be negative, got {}", amount),
        ));
    }
}

fn check_rate(path: &str, rate: Decimal, issues: &mut Vec<ValidationIssue>) {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        issues.push(ValidationIssue::new(
            path,
            format!("rate must be within [0, 1], got {}", rate),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const PACK_2024: &str = include_str!("../../config/tax-rules/2024.json");

    fn valid_raw() -> Value {
        serde_json::from_str(PACK_2024).unwrap()
    }

    fn issues_of(raw: Value) -> ValidationIssues {
        match validate_value(raw, "test") {
            Err(EngineError::SchemaViolation { issues, .. }) => issues,
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_pack_is_valid() {
        let pack = validate_str(PACK_2024, "2024.json").unwrap();

        assert_eq!(pack.year(), 2024);
        assert_eq!(pack.tax_brackets().len(), 7);
        assert_eq!(pack.tax_brackets()[0].min, Decimal::ZERO);
        assert_eq!(pack.tax_brackets()[6].max, None);
        assert_eq!(pack.stale_after_days(), 35);
    }

    #[test]
    fn test_bracket_gap_is_reported_at_offending_min() {
        let mut raw = valid_raw();
        raw["taxBrackets"][2]["min"] = json!(21000);

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets[2].min"));
    }

    #[test]
    fn test_first_bracket_must_start_at_zero() {
        let mut raw = valid_raw();
        raw["taxBrackets"][0]["min"] = json!(100);

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets[0].min"));
    }

    #[test]
    fn test_single_bracket_is_rejected() {
        let mut raw = valid_raw();
        raw["taxBrackets"] = json!([{ "min": 0, "max": null, "rate": 0.2 }]);

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets"));
    }

    #[test]
    fn test_open_bracket_before_last_is_rejected() {
        let mut raw = valid_raw();
        raw["taxBrackets"][3]["max"] = Value::Null;

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets[3].max"));
    }

    #[test]
    fn test_max_not_above_min_is_rejected() {
        let mut raw = valid_raw();
        raw["taxBrackets"][1]["max"] = json!(12816);
        raw["taxBrackets"][2]["min"] = json!(12816);

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets[1].max"));
    }

    #[test]
    fn test_rate_out_of_range_is_rejected() {
        let mut raw = valid_raw();
        raw["taxBrackets"][4]["rate"] = json!(1.5);

        let issues = issues_of(raw);
        assert!(issues.has_path("taxBrackets[4].rate"));
    }

    #[test]
    fn test_pendler_table_continuity_is_checked() {
        let mut raw = valid_raw();
        raw["pendlerpauschale"]["gross"][2]["minKm"] = json!(45);

        let issues = issues_of(raw);
        assert!(issues.has_path("pendlerpauschale.gross[2].minKm"));
    }

    #[test]
    fn test_pendler_max_km_not_above_min_km_is_rejected() {
        let mut raw = valid_raw();
        raw["pendlerpauschale"]["klein"][0]["maxKm"] = json!(10);

        let issues = issues_of(raw);
        assert!(issues.has_path("pendlerpauschale.klein[0].maxKm"));
    }

    #[test]
    fn test_empty_pendler_table_is_rejected() {
        let mut raw = valid_raw();
        raw["pendlerpauschale"]["klein"] = json!([]);

        let issues = issues_of(raw);
        assert!(issues.has_path("pendlerpauschale.klein"));
    }

    #[test]
    fn test_negative_amounts_are_rejected() {
        let mut raw = valid_raw();
        raw["credits"]["churchTaxMax"] = json!(-1);
        raw["credits"]["alleinerzieher"]["firstChild"] = json!(-572);

        let issues = issues_of(raw);
        assert!(issues.has_path("credits.churchTaxMax"));
        assert!(issues.has_path("credits.alleinerzieher.firstChild"));
    }

    #[test]
    fn test_stale_after_days_range() {
        let mut raw = valid_raw();
        raw["staleAfterDays"] = json!(0);
        assert!(issues_of(raw).has_path("staleAfterDays"));

        let mut raw = valid_raw();
        raw["staleAfterDays"] = json!(400);
        assert!(issues_of(raw).has_path("staleAfterDays"));
    }

    #[test]
    fn test_missing_stale_after_days_defaults() {
        let mut raw = valid_raw();
        raw.as_object_mut().unwrap().remove("staleAfterDays");

        let pack = validate_value(raw, "test").unwrap();
        assert_eq!(pack.stale_after_days(), 35);
    }

    #[test]
    fn test_sources_must_be_present_and_urls() {
        let mut raw = valid_raw();
        raw["metadata"]["sources"] = json!([]);
        assert!(issues_of(raw).has_path("metadata.sources"));

        let mut raw = valid_raw();
        raw["metadata"]["sources"] = json!(["bmf.gv.at"]);
        assert!(issues_of(raw).has_path("metadata.sources[0]"));
    }

    #[test]
    fn test_all_issues_reported_in_one_pass() {
        let mut raw = valid_raw();
        raw["taxBrackets"][0]["min"] = json!(5);
        raw["taxBrackets"][5]["rate"] = json!(-0.1);
        raw["medical"]["defaultRate"] = json!(2);
        raw["childcare"]["sharedCustodyFactor"] = json!(1.2);
        raw["pendlerpauschale"]["gross"][1]["minKm"] = json!(25);

        let issues = issues_of(raw);
        assert_eq!(issues.len(), 5, "issues: {}", issues);
        assert!(issues.has_path("taxBrackets[0].min"));
        assert!(issues.has_path("taxBrackets[5].rate"));
        assert!(issues.has_path("medical.defaultRate"));
        assert!(issues.has_path("childcare.sharedCustodyFactor"));
        assert!(issues.has_path("pendlerpauschale.gross[1].minKm"));
    }

    #[test]
    fn test_wrong_types_are_structural_issues_with_paths() {
        let mut raw = valid_raw();
        raw["homeOffice"]["maxDays"] = json!("a hundred");
        raw["taxBrackets"][2]["rate"] = json!("high");

        let issues = issues_of(raw);
        assert_eq!(issues.len(), 2);
        assert!(issues.has_path("homeOffice.maxDays"));
        assert!(issues.has_path("taxBrackets[2].rate"));
        assert!(issues.issues().iter().all(|i| !i.path.is_empty()));
    }

    #[test]
    fn test_missing_section_is_reported_by_name() {
        let mut raw = valid_raw();
        raw.as_object_mut().unwrap().remove("childcare");

        let issues = issues_of(raw);
        assert!(issues.has_path("childcare"));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let result = validate_str("{ \"year\": ", "broken.json");

        match result {
            Err(EngineError::RulePackParse { path, .. }) => assert_eq!(path, "broken.json"),
            other => panic!("Expected RulePackParse, got {:?}", other),
        }
    }
}
