//! Home office allowance calculation.

use rust_decimal::Decimal;

use crate::config::HomeOfficeRules;
use crate::models::{AuditStep, HomeOfficeEntry};

/// Legal basis of the home office allowance.
pub const HOME_OFFICE_LEGAL_REF: &str = "§ 16 Abs. 1 Z 7a lit. b EStG";

/// The result of the home office calculation.
#[derive(Debug, Clone)]
pub struct HomeOfficeResult {
    /// The breakdown entry.
    pub entry: HomeOfficeEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the home office allowance.
///
/// Days are capped at `max_days`, multiplied by `per_day`, and the product
/// is capped at `max_amount`.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::calculate_home_office;
/// use tax_rule_engine::config::HomeOfficeRules;
///
/// let rules = HomeOfficeRules {
///     per_day: Decimal::from(3),
///     max_amount: Decimal::from(300),
///     max_days: 100,
/// };
///
/// let result = calculate_home_office(150, &rules, 1);
/// assert_eq!(result.entry.days, 100);
/// assert_eq!(result.entry.amount, Decimal::from(300));
/// ```
pub fn calculate_home_office(
    claimed_days: u32,
    rules: &HomeOfficeRules,
    step_number: u32,
) -> HomeOfficeResult {
    let days = claimed_days.min(rules.max_days);
    let uncapped_amount = Decimal::from(days) * rules.per_day;
    let amount = uncapped_amount.min(rules.max_amount);

    let days_capped = days < claimed_days;
    let amount_capped = amount < uncapped_amount;

    let mut reasoning = format!(
        "{} days x €{} = €{}",
        days,
        rules.per_day.normalize(),
        uncapped_amount.normalize()
    );
    if days_capped {
        reasoning.push_str(&format!(
            " ({} days claimed, capped at {} days)",
            claimed_days, rules.max_days
        ));
    }
    if amount_capped {
        reasoning.push_str(&format!(
            " (capped at annual maximum €{})",
            rules.max_amount.normalize()
        ));
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "home_office".to_string(),
        rule_name: "Home Office Allowance".to_string(),
        legal_ref: HOME_OFFICE_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "claimed_days": claimed_days,
            "per_day": rules.per_day.normalize().to_string(),
            "max_days": rules.max_days,
            "max_amount": rules.max_amount.normalize().to_string()
        }),
        output: serde_json::json!({
            "days": days,
            "amount": amount.normalize().to_string(),
            "days_capped": days_capped,
            "amount_capped": amount_capped
        }),
        reasoning: reasoning.clone(),
    };

    HomeOfficeResult {
        entry: HomeOfficeEntry {
            claimed_days,
            days,
            amount,
            legal_ref: HOME_OFFICE_LEGAL_REF.to_string(),
            rationale: reasoning,
        },
        audit_step,
    }
}
