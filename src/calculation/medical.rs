//! Extraordinary medical expense calculation.
//!
//! Medical expenses are deductible only above a self-retention
//! (Selbstbehalt) of gross income. The rate depends on disability and on the
//! family situation.

use rust_decimal::Decimal;

use crate::config::MedicalRules;
use crate::models::{AuditStep, MedicalEntry, TaxProfile};

/// Legal basis of the medical expense deduction.
pub const MEDICAL_LEGAL_REF: &str = "§ 34 Abs. 4 EStG";

/// Which self-retention rate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfRetentionCategory {
    /// Taxpayer has a disability.
    Disability,
    /// Sole earner or single parent with three or more children.
    SingleThreeOrMoreChildren,
    /// Sole earner or single parent with exactly two children.
    SingleTwoChildren,
    /// Couple with more than three children.
    ManyChildren,
    /// Everyone else.
    Default,
}

impl SelfRetentionCategory {
    /// Selects the category for a profile.
    pub fn for_profile(profile: &TaxProfile) -> Self {
        let children = profile.family.child_count();

        if profile.personal_info.has_disability {
            SelfRetentionCategory::Disability
        } else if profile.family.single_earner || profile.family.single_parent {
            match children {
                0 | 1 => SelfRetentionCategory::Default,
                2 => SelfRetentionCategory::SingleTwoChildren,
                _ => SelfRetentionCategory::SingleThreeOrMoreChildren,
            }
        } else if children > 3 {
            SelfRetentionCategory::ManyChildren
        } else {
            SelfRetentionCategory::Default
        }
    }

    /// Returns the rate for this category from `rules`.
    pub fn rate(self, rules: &MedicalRules) -> Decimal {
        match self {
            SelfRetentionCategory::Disability => rules.disability_rate,
            SelfRetentionCategory::SingleThreeOrMoreChildren => {
                rules.single_three_or_more_children_rate
            }
            SelfRetentionCategory::SingleTwoChildren => rules.single_two_children_rate,
            SelfRetentionCategory::ManyChildren => rules.many_children_rate,
            SelfRetentionCategory::Default => rules.default_rate,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            SelfRetentionCategory::Disability => "disability",
            SelfRetentionCategory::SingleThreeOrMoreChildren => {
                "sole earner or single parent with 3 or more children"
            }
            SelfRetentionCategory::SingleTwoChildren => {
                "sole earner or single parent with 2 children"
            }
            SelfRetentionCategory::ManyChildren => "more than 3 children",
            SelfRetentionCategory::Default => "standard",
        }
    }
}

/// The result of the medical expense calculation.
#[derive(Debug, Clone)]
pub struct MedicalResult {
    /// The breakdown entry.
    pub entry: MedicalEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates deductible medical expenses for a profile.
///
/// `self_retention = gross_income * rate`, and only the part of the expenses
/// above it is deductible.
pub fn calculate_medical(
    profile: &TaxProfile,
    rules: &MedicalRules,
    step_number: u32,
) -> MedicalResult {
    let expenses = profile.deductions.medical_expenses.max(Decimal::ZERO);
    let category = SelfRetentionCategory::for_profile(profile);
    let rate = category.rate(rules);
    let self_retention = profile.income.gross_income.max(Decimal::ZERO) * rate;
    let deductible = (expenses - self_retention).max(Decimal::ZERO);

    let reasoning = format!(
        "Expenses €{} less self-retention €{} ({} rate {}%) = €{}",
        expenses.normalize(),
        self_retention.normalize(),
        category.describe(),
        (rate * Decimal::ONE_HUNDRED).normalize(),
        deductible.normalize()
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "medical_expenses".to_string(),
        rule_name: "Extraordinary Medical Expenses".to_string(),
        legal_ref: MEDICAL_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "expenses": expenses.normalize().to_string(),
            "gross_income": profile.income.gross_income.normalize().to_string(),
            "has_disability": profile.personal_info.has_disability,
            "single_earner": profile.family.single_earner,
            "single_parent": profile.family.single_parent,
            "children": profile.family.child_count()
        }),
        output: serde_json::json!({
            "category": category.describe(),
            "self_retention_rate": rate.normalize().to_string(),
            "self_retention": self_retention.normalize().to_string(),
            "deductible": deductible.normalize().to_string()
        }),
        reasoning: reasoning.clone(),
    };

    MedicalResult {
        entry: MedicalEntry {
            expenses,
            self_retention_rate: rate,
            self_retention,
            deductible,
            legal_ref: MEDICAL_LEGAL_REF.to_string(),
            rationale: reasoning,
        },
        audit_step,
    }
}
