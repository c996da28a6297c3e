//! Pass-through and capped expense lines.
//!
//! Work equipment, education, and donations are taken as claimed. Church
//! contributions are capped by the rule pack.

use rust_decimal::Decimal;

use crate::models::{AuditStep, CappedEntry, ItemizedEntry};

/// Legal basis of work equipment costs.
pub const WORK_EQUIPMENT_LEGAL_REF: &str = "§ 16 Abs. 1 Z 7 EStG";

/// Legal basis of education costs.
pub const EDUCATION_LEGAL_REF: &str = "§ 16 Abs. 1 Z 10 EStG";

/// Legal basis of church contributions.
pub const CHURCH_TAX_LEGAL_REF: &str = "§ 18 Abs. 1 Z 5 EStG";

/// Legal basis of donations.
pub const DONATIONS_LEGAL_REF: &str = "§ 18 Abs. 1 Z 7 EStG";

/// An itemized expense kind that is deducted as claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemizedKind {
    /// Work equipment (Arbeitsmittel).
    WorkEquipment,
    /// Education and training (Fortbildung).
    Education,
    /// Donations (Spenden).
    Donations,
}

impl ItemizedKind {
    fn rule_id(self) -> &'static str {
        match self {
            ItemizedKind::WorkEquipment => "work_equipment",
            ItemizedKind::Education => "education",
            ItemizedKind::Donations => "donations",
        }
    }

    fn rule_name(self) -> &'static str {
        match self {
            ItemizedKind::WorkEquipment => "Work Equipment",
            ItemizedKind::Education => "Education and Training",
            ItemizedKind::Donations => "Donations",
        }
    }

    fn legal_ref(self) -> &'static str {
        match self {
            ItemizedKind::WorkEquipment => WORK_EQUIPMENT_LEGAL_REF,
            ItemizedKind::Education => EDUCATION_LEGAL_REF,
            ItemizedKind::Donations => DONATIONS_LEGAL_REF,
        }
    }
}

/// The result of a pass-through expense line.
#[derive(Debug, Clone)]
pub struct ItemizedResult {
    /// The breakdown entry.
    pub entry: ItemizedEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// The result of the church contribution line.
#[derive(Debug, Clone)]
pub struct ChurchTaxResult {
    /// The breakdown entry.
    pub entry: CappedEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Takes a claimed expense as deductible. Negative claims count as zero.
pub fn calculate_itemized(kind: ItemizedKind, claimed: Decimal, step_number: u32) -> ItemizedResult {
    let amount = claimed.max(Decimal::ZERO);

    let reasoning = if amount.is_zero() {
        format!("No {} claimed", kind.rule_name().to_lowercase())
    } else {
        format!(
            "{} of €{} deducted as claimed",
            kind.rule_name(),
            amount.normalize()
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: kind.rule_id().to_string(),
        rule_name: kind.rule_name().to_string(),
        legal_ref: kind.legal_ref().to_string(),
        input: serde_json::json!({ "claimed": claimed.normalize().to_string() }),
        output: serde_json::json!({ "amount": amount.normalize().to_string() }),
        reasoning: reasoning.clone(),
    };

    ItemizedResult {
        entry: ItemizedEntry {
            amount,
            legal_ref: kind.legal_ref().to_string(),
            rationale: reasoning,
        },
        audit_step,
    }
}

/// Caps the claimed church contribution at `cap`.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::calculate_church_tax;
///
/// let result = calculate_church_tax(Decimal::from(850), Decimal::from(600), 1);
/// assert_eq!(result.entry.amount, Decimal::from(600));
/// assert!(result.entry.capped);
/// ```
pub fn calculate_church_tax(claimed: Decimal, cap: Decimal, step_number: u32) -> ChurchTaxResult {
    let claimed_amount = claimed.max(Decimal::ZERO);
    let amount = claimed_amount.min(cap);
    let capped = amount < claimed_amount;

    let reasoning = if capped {
        format!(
            "Church contribution of €{} capped at maximum €{}",
            claimed_amount.normalize(),
            cap.normalize()
        )
    } else {
        format!(
            "Church contribution of €{} within maximum €{}",
            amount.normalize(),
            cap.normalize()
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "church_tax".to_string(),
        rule_name: "Church Contribution".to_string(),
        legal_ref: CHURCH_TAX_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "claimed": claimed.normalize().to_string(),
            "cap": cap.normalize().to_string()
        }),
        output: serde_json::json!({
            "amount": amount.normalize().to_string(),
            "capped": capped
        }),
        reasoning: reasoning.clone(),
    };

    ChurchTaxResult {
        entry: CappedEntry {
            claimed,
            cap,
            amount,
            capped,
            legal_ref: CHURCH_TAX_LEGAL_REF.to_string(),
            rationale: reasoning,
        },
        audit_step,
    }
}
