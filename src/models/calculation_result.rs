//! Calculation result models for the tax rule engine.
//!
//! This module contains the [`TaxCalculationResult`] type and its associated
//! structures that capture every output of a tax calculation: the itemized
//! deduction breakdown, the tax credits, the tax due, and an audit trace.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which commuting allowance table was applied.
///
/// # Example
///
/// ```
/// use tax_rule_engine::models::PendlerKind;
///
/// assert_eq!(serde_json::to_string(&PendlerKind::Gross).unwrap(), "\"gross\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendlerKind {
    /// No allowance applies.
    None,
    /// Small allowance, public transport feasible.
    Klein,
    /// Large allowance, public transport not feasible.
    Gross,
}

impl std::fmt::Display for PendlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendlerKind::None => write!(f, "none"),
            PendlerKind::Klein => write!(f, "klein"),
            PendlerKind::Gross => write!(f, "gross"),
        }
    }
}

/// Commuting allowance (Pendlerpauschale) line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendlerpauschaleEntry {
    /// The table that applied.
    pub kind: PendlerKind,
    /// One-way distance in km.
    pub distance: Decimal,
    /// Commuting days claimed.
    pub days_per_year: u32,
    /// Full-year amount of the matched band.
    pub annual_amount: Decimal,
    /// Pro-rated allowance.
    pub amount: Decimal,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// Home office allowance line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeOfficeEntry {
    /// Days claimed by the taxpayer.
    pub claimed_days: u32,
    /// Days that count after the day cap.
    pub days: u32,
    /// Allowance after the amount cap.
    pub amount: Decimal,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// A pass-through expense line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedEntry {
    /// Deductible amount.
    pub amount: Decimal,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// An expense line subject to a cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedEntry {
    /// Amount claimed by the taxpayer.
    pub claimed: Decimal,
    /// The cap from the rule pack.
    pub cap: Decimal,
    /// Deductible amount after the cap.
    pub amount: Decimal,
    /// Whether the cap reduced the claim.
    pub capped: bool,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// Extraordinary medical expense line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalEntry {
    /// Expenses claimed.
    pub expenses: Decimal,
    /// Self-retention rate selected for the family situation.
    pub self_retention_rate: Decimal,
    /// Self-retention amount (gross income times rate).
    pub self_retention: Decimal,
    /// Amount exceeding the self-retention.
    pub deductible: Decimal,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// Childcare cost line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildcareEntry {
    /// Amount claimed.
    pub claimed: Decimal,
    /// Number of children young enough to qualify.
    pub eligible_children: u32,
    /// Accumulated per-child maximum.
    pub max_deductible: Decimal,
    /// Deductible amount.
    pub amount: Decimal,
    /// Legal basis.
    pub legal_ref: String,
    /// Human-readable explanation.
    pub rationale: String,
}

/// The full itemized deduction breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    /// Commuting allowance.
    pub pendlerpauschale: PendlerpauschaleEntry,
    /// Home office allowance.
    pub home_office: HomeOfficeEntry,
    /// Work equipment.
    pub work_equipment: ItemizedEntry,
    /// Education and training.
    pub education: ItemizedEntry,
    /// Church contributions.
    pub church_tax: CappedEntry,
    /// Donations.
    pub donations: ItemizedEntry,
    /// Extraordinary medical expenses.
    pub medical: MedicalEntry,
    /// Childcare costs.
    pub childcare: ChildcareEntry,
    /// Sum of itemized income-related expenses (Werbungskosten).
    pub total_werbungskosten: Decimal,
    /// Flat allowance from the rule pack.
    pub werbungskosten_pauschale: Decimal,
    /// The larger of itemized expenses and the flat allowance.
    pub effective_werbungskosten: Decimal,
    /// Whether the flat allowance was used instead of itemized expenses.
    pub pauschale_applied: bool,
    /// Sum of special expenses (Sonderausgaben).
    pub total_sonderausgaben: Decimal,
    /// Sum of extraordinary burdens (außergewöhnliche Belastungen).
    pub total_aussergewoehnliche_belastungen: Decimal,
    /// Everything subtracted from gross income.
    pub effective_deductions: Decimal,
}

/// Tax credits (Absetzbeträge) subtracted from the tariff tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absetzbetraege {
    /// Traffic credit.
    pub verkehrsabsetzbetrag: Decimal,
    /// Employee credit.
    pub arbeitnehmerabsetzbetrag: Decimal,
    /// Sole earner credit.
    pub alleinverdiener: Decimal,
    /// Single parent credit.
    pub alleinerzieher: Decimal,
    /// Family bonus across all qualifying children.
    pub familienbonus: Decimal,
    /// Children under 18 counted for the family bonus.
    pub familienbonus_children: u32,
    /// Children aged 18 to 23 counted for the family bonus.
    pub familienbonus_adult_children: u32,
    /// Sum of all credits.
    pub total: Decimal,
}

/// A single step in the audit trace recording a calculation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Legal reference for this rule.
    pub legal_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings point at inputs the calculation does not fully cover; they
/// never change the figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// The complete result of an annual tax calculation.
///
/// Exactly one of `estimated_refund` and `estimated_backpayment` is
/// non-zero, unless withheld tax matches the tax due exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub calculated_at: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The tax year assessed.
    pub tax_year: i32,
    /// Version of the rule pack used.
    pub rule_pack_version: String,
    /// Annual gross income.
    pub gross_income: Decimal,
    /// Wage tax already withheld.
    pub withheld_tax: Decimal,
    /// Gross income less effective deductions, floored at zero.
    pub taxable_income: Decimal,
    /// Itemized deductions.
    pub breakdown: DeductionBreakdown,
    /// Tax credits.
    pub absetzbetraege: Absetzbetraege,
    /// Tariff tax on taxable income, before credits.
    pub calculated_tax: Decimal,
    /// Tariff tax less credits, floored at zero.
    pub tax_after_credits: Decimal,
    /// Amount to be refunded.
    pub estimated_refund: Decimal,
    /// Amount to be paid.
    pub estimated_backpayment: Decimal,
    /// Narrative summary of the outcome.
    pub summary: String,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

impl TaxCalculationResult {
    /// Returns true if the taxpayer gets money back.
    pub fn is_refund(&self) -> bool {
        self.estimated_refund > Decimal::ZERO
    }

    /// Returns the refund as a positive and the backpayment as a negative number.
    pub fn net_outcome(&self) -> Decimal {
        self.estimated_refund - self.estimated_backpayment
    }
}
