//! Childcare cost calculation.
//!
//! Childcare costs are deductible up to a per-child maximum for every child
//! younger than the rule pack's age limit at the end of the tax year.
//! Children living outside the household count with the shared custody
//! factor.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::ChildcareRules;
use crate::models::{AuditStep, Child, ChildcareEntry};

use super::age::age_at;
use super::rounding::round_units;

/// Legal basis of the childcare deduction.
pub const CHILDCARE_LEGAL_REF: &str = "§ 34 Abs. 9 EStG";

/// The result of the childcare calculation.
#[derive(Debug, Clone)]
pub struct ChildcareResult {
    /// The breakdown entry.
    pub entry: ChildcareEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates deductible childcare costs.
///
/// Children not yet born at `year_end` are ignored.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::calculate_childcare;
/// use tax_rule_engine::config::ChildcareRules;
/// use tax_rule_engine::models::Child;
///
/// let rules = ChildcareRules {
///     max_per_child: Decimal::from(4000),
///     shared_custody_factor: Decimal::new(5, 1),
///     max_age: 14,
/// };
/// let children = vec![Child {
///     birth_date: NaiveDate::from_ymd_opt(2018, 6, 1).unwrap(),
///     receiving_family_allowance: true,
///     in_household: false,
/// }];
/// let year_end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
///
/// let result = calculate_childcare(Decimal::from(5000), &children, &rules, year_end, 1);
/// assert_eq!(result.entry.max_deductible, Decimal::from(2000));
/// assert_eq!(result.entry.amount, Decimal::from(2000));
/// ```
pub fn calculate_childcare(
    claimed: Decimal,
    children: &[Child],
    rules: &ChildcareRules,
    year_end: NaiveDate,
    step_number: u32,
) -> ChildcareResult {
    let claimed_amount = claimed.max(Decimal::ZERO);
    let max_age = i32::try_from(rules.max_age).unwrap_or(i32::MAX);

    let mut eligible_children = 0u32;
    let mut max_deductible = Decimal::ZERO;

    for child in children {
        let age = age_at(child.birth_date, year_end);
        if !(0..max_age).contains(&age) {
            continue;
        }

        eligible_children += 1;
        max_deductible += if child.in_household {
            rules.max_per_child
        } else {
            round_units(rules.max_per_child * rules.shared_custody_factor)
        };
    }

    let amount = claimed_amount.min(max_deductible);
    let capped = amount < claimed_amount;

    let reasoning = if eligible_children == 0 {
        if claimed_amount.is_zero() {
            "No childcare costs claimed".to_string()
        } else {
            format!(
                "No child younger than {} at {} - childcare costs of €{} not deductible",
                rules.max_age,
                year_end,
                claimed_amount.normalize()
            )
        }
    } else if capped {
        format!(
            "Childcare costs of €{} capped at €{} for {} eligible child(ren)",
            claimed_amount.normalize(),
            max_deductible.normalize(),
            eligible_children
        )
    } else {
        format!(
            "Childcare costs of €{} within the €{} maximum for {} eligible child(ren)",
            amount.normalize(),
            max_deductible.normalize(),
            eligible_children
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "childcare".to_string(),
        rule_name: "Childcare Costs".to_string(),
        legal_ref: CHILDCARE_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "claimed": claimed.normalize().to_string(),
            "children": children.len(),
            "reference_date": year_end.to_string(),
            "max_age": rules.max_age
        }),
        output: serde_json::json!({
            "eligible_children": eligible_children,
            "max_deductible": max_deductible.normalize().to_string(),
            "amount": amount.normalize().to_string(),
            "capped": capped
        }),
        reasoning: reasoning.clone(),
    };

    ChildcareResult {
        entry: ChildcareEntry {
            claimed,
            eligible_children,
            max_deductible,
            amount,
            legal_ref: CHILDCARE_LEGAL_REF.to_string(),
            rationale: reasoning,
        },
        audit_step,
    }
}
