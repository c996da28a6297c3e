//! Progressive income tax tariff.
//!
//! Taxable income is split across the rule pack's brackets in order, and
//! each slice is taxed at its bracket's marginal rate.

use rust_decimal::Decimal;

use crate::config::TaxBracket;
use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

use super::rounding::round_cents;

/// Legal basis of the income tax tariff.
pub const TARIFF_LEGAL_REF: &str = "§ 33 Abs. 1 EStG";

/// Tax charged within one bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSlice {
    /// Lower bound of the bracket.
    pub min: Decimal,
    /// Upper bound of the bracket, `None` for the open top bracket.
    pub max: Option<Decimal>,
    /// Marginal rate.
    pub rate: Decimal,
    /// Income taxed in this bracket.
    pub taxed_amount: Decimal,
    /// Unrounded tax for the slice.
    pub tax: Decimal,
}

/// The result of the tariff calculation.
#[derive(Debug, Clone)]
pub struct ProgressiveTaxResult {
    /// Tariff tax rounded to cents.
    pub tax: Decimal,
    /// Per-bracket slices that received income.
    pub slices: Vec<BracketSlice>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

fn walk_brackets(income: Decimal, brackets: &[TaxBracket]) -> EngineResult<Vec<BracketSlice>> {
    if brackets.is_empty() {
        return Err(EngineError::CalculationError {
            message: "Rule pack has no tax brackets".to_string(),
        });
    }

    let mut remaining = income.max(Decimal::ZERO);
    let mut slices = Vec::new();

    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }

        let taxed_amount = match bracket.max {
            Some(max) => remaining.min((max - bracket.min).max(Decimal::ZERO)),
            None => remaining,
        };
        remaining -= taxed_amount;

        slices.push(BracketSlice {
            min: bracket.min,
            max: bracket.max,
            rate: bracket.rate,
            taxed_amount,
            tax: taxed_amount * bracket.rate,
        });
    }

    Ok(slices)
}

/// Returns the tariff tax on `income`, rounded to cents.
///
/// Returns `CalculationError` if `brackets` is empty. Income beyond the last
/// closed bracket is left untaxed.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::progressive_tax;
/// use tax_rule_engine::config::TaxBracket;
///
/// let brackets = vec![
///     TaxBracket { min: Decimal::ZERO, max: Some(Decimal::from(10000)), rate: Decimal::ZERO },
///     TaxBracket { min: Decimal::from(10000), max: None, rate: Decimal::new(2, 1) },
/// ];
/// assert_eq!(progressive_tax(Decimal::from(15000), &brackets).unwrap(), Decimal::from(1000));
/// ```
pub fn progressive_tax(income: Decimal, brackets: &[TaxBracket]) -> EngineResult<Decimal> {
    let slices = walk_brackets(income, brackets)?;
    Ok(round_cents(slices.iter().map(|slice| slice.tax).sum()))
}

/// Calculates the tariff tax and records the bracket walk.
pub fn calculate_progressive_tax(
    taxable_income: Decimal,
    brackets: &[TaxBracket],
    step_number: u32,
) -> EngineResult<ProgressiveTaxResult> {
    let slices = walk_brackets(taxable_income, brackets)?;
    let tax = round_cents(slices.iter().map(|slice| slice.tax).sum());

    let breakdown: Vec<serde_json::Value> = slices
        .iter()
        .map(|slice| {
            serde_json::json!({
                "min": slice.min.normalize().to_string(),
                "max": slice.max.map(|max| max.normalize().to_string()),
                "rate": slice.rate.normalize().to_string(),
                "taxed_amount": slice.taxed_amount.normalize().to_string(),
                "tax": round_cents(slice.tax).normalize().to_string()
            })
        })
        .collect();

    let top_rate = slices
        .iter()
        .rev()
        .find(|slice| slice.taxed_amount > Decimal::ZERO)
        .map(|slice| slice.rate)
        .unwrap_or(Decimal::ZERO);

    let reasoning = format!(
        "Taxable income €{} spans {} bracket(s), marginal rate {}%: tax €{}",
        taxable_income.normalize(),
        slices.len(),
        (top_rate * Decimal::ONE_HUNDRED).normalize(),
        tax.normalize()
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "progressive_tax".to_string(),
        rule_name: "Progressive Income Tax".to_string(),
        legal_ref: TARIFF_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "taxable_income": taxable_income.normalize().to_string(),
            "brackets": brackets.len()
        }),
        output: serde_json::json!({
            "slices": breakdown,
            "tax": tax.normalize().to_string()
        }),
        reasoning,
    };

    Ok(ProgressiveTaxResult {
        tax,
        slices,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn bracket(min: &str, max: Option<&str>, rate: &str) -> TaxBracket {
        TaxBracket {
            min: dec(min),
            max: max.map(dec),
            rate: dec(rate),
        }
    }

    fn brackets_2024() -> Vec<TaxBracket> {
        vec![
            bracket("0", Some("12816"), "0"),
            bracket("12816", Some("20818"), "0.2"),
            bracket("20818", Some("34513"), "0.3"),
            bracket("34513", Some("66612"), "0.4"),
            bracket("66612", Some("99266"), "0.48"),
            bracket("99266", Some("1000000"), "0.5"),
            bracket("1000000", None, "0.55"),
        ]
    }

    #[test]
    fn test_income_in_zero_bracket_is_tax_free() {
        assert_eq!(progressive_tax(dec("12000"), &brackets_2024()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_35k_minus_pauschale() {
        // 8002 * 0.2 + 13695 * 0.3 + 355 * 0.4
        // = 1600.40 + 4108.50 + 142.00 = 5850.90
        let tax = progressive_tax(dec("34868"), &brackets_2024()).unwrap();
        assert_eq!(tax, dec("5850.90"));
    }

    #[test]
    fn test_top_bracket_is_open_ended() {
        let result = calculate_progressive_tax(dec("1000100"), &brackets_2024(), 10).unwrap();
        let last = result.slices.last().unwrap();
        assert_eq!(last.max, None);
        assert_eq!(last.taxed_amount, dec("100"));
        assert_eq!(result.slices.len(), 7);
    }

    #[test]
    fn test_result_is_rounded_to_cents() {
        let brackets = vec![
            bracket("0", Some("100"), "0"),
            bracket("100", None, "0.333"),
        ];
        // 0.5 * 0.333 = 0.1665 -> 0.17
        assert_eq!(progressive_tax(dec("100.5"), &brackets).unwrap(), dec("0.17"));
    }

    #[test]
    fn test_zero_and_negative_income() {
        assert_eq!(progressive_tax(Decimal::ZERO, &brackets_2024()).unwrap(), Decimal::ZERO);
        assert_eq!(progressive_tax(dec("-500"), &brackets_2024()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_empty_brackets_is_an_error() {
        let err = progressive_tax(dec("1000"), &[]).unwrap_err();
        assert!(matches!(err, EngineError::CalculationError { .. }));
    }

    #[test]
    fn test_income_beyond_closed_brackets_is_untaxed() {
        let brackets = vec![
            bracket("0", Some("1000"), "0"),
            bracket("1000", Some("2000"), "0.1"),
        ];
        assert_eq!(progressive_tax(dec("5000"), &brackets).unwrap(), dec("100"));
    }

    #[test]
    fn test_audit_step_lists_slices() {
        let result = calculate_progressive_tax(dec("25000"), &brackets_2024(), 10).unwrap();
        assert_eq!(result.audit_step.step_number, 10);
        assert_eq!(result.audit_step.output["slices"].as_array().unwrap().len(), 3);
        assert!(result.audit_step.reasoning.contains("30%"));
    }
}
