//! Annual tax calculation.
//!
//! [`calculate_tax`] runs every rule in order against a validated rule pack
//! and assembles the [`TaxCalculationResult`] with its audit trace.
//! [`TaxCalculator`] adds the optional narrative summary on top.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::config::TaxRulePack;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditTrace, AuditWarning, DeductionBreakdown, TaxCalculationResult, TaxProfile,
};

use super::absetzbetraege::calculate_absetzbetraege;
use super::age::tax_year_end;
use super::childcare::calculate_childcare;
use super::home_office::calculate_home_office;
use super::itemized::{ItemizedKind, calculate_church_tax, calculate_itemized};
use super::medical::calculate_medical;
use super::pendlerpauschale::calculate_pendlerpauschale;
use super::progressive_tax::calculate_progressive_tax;
use super::summary::{
    DEFAULT_SUMMARY_TIMEOUT, SummaryGenerator, fallback_summary, generate_or_fallback,
};

/// Legal basis of the flat allowance for income-related expenses.
pub const WERBUNGSKOSTEN_PAUSCHALE_LEGAL_REF: &str = "§ 16 Abs. 3 EStG";

fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} exceeds the representable decimal range", what),
    }
}

/// Adds up `amounts`, failing instead of panicking on overflow.
fn checked_total(what: &str, amounts: &[Decimal]) -> EngineResult<Decimal> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
        .ok_or_else(|| overflow(what))
}

fn checked_difference(what: &str, minuend: Decimal, subtrahend: Decimal) -> EngineResult<Decimal> {
    minuend
        .checked_sub(subtrahend)
        .ok_or_else(|| overflow(what))
}

fn collect_warnings(profile: &TaxProfile, pack: &TaxRulePack) -> Vec<AuditWarning> {
    let mut warnings = Vec::new();

    if profile.tax_year != pack.year() {
        warnings.push(AuditWarning {
            code: "TAX_YEAR_MISMATCH".to_string(),
            message: format!(
                "Profile is for tax year {} but the rule pack is for {}",
                profile.tax_year,
                pack.year()
            ),
            severity: "high".to_string(),
        });
    }

    if profile.income.has_self_employment {
        warnings.push(AuditWarning {
            code: "SELF_EMPLOYMENT_NOT_COVERED".to_string(),
            message: "Self-employment income is not part of this calculation".to_string(),
            severity: "medium".to_string(),
        });
    }

    if profile.income.employer_count > 1 {
        warnings.push(AuditWarning {
            code: "MULTIPLE_EMPLOYERS".to_string(),
            message: format!(
                "{} employers during the year; withheld tax is assumed to cover all of them",
                profile.income.employer_count
            ),
            severity: "low".to_string(),
        });
    }

    warnings
}

/// Calculates the annual income tax for `profile` under `pack`.
///
/// The pack is assumed to be validated and fresh; gate on
/// [`RuleStatusChecker`](crate::config::RuleStatusChecker) before calling.
/// The result carries the deterministic fallback summary.
///
/// # Errors
///
/// Returns `CalculationError` if the pack has no tax brackets, the tax year
/// has no representable year end, or the profile's amounts push a total
/// beyond the decimal range.
pub fn calculate_tax(profile: &TaxProfile, pack: &TaxRulePack) -> EngineResult<TaxCalculationResult> {
    let start_time = Instant::now();
    let mut steps: Vec<AuditStep> = Vec::new();
    let mut step_number: u32 = 1;

    let year_end = tax_year_end(pack.year())?;
    let credits = pack.credits();
    let deductions = &profile.deductions;
    let gross_income = profile.income.gross_income;
    let withheld_tax = profile.income.withheld_tax;

    // Werbungskosten
    let pendler = calculate_pendlerpauschale(
        &deductions.pendlerpauschale,
        pack.pendlerpauschale(),
        step_number,
    );
    steps.push(pendler.audit_step);
    step_number += 1;

    let home_office = calculate_home_office(deductions.home_office.days, pack.home_office(), step_number);
    steps.push(home_office.audit_step);
    step_number += 1;

    let work_equipment =
        calculate_itemized(ItemizedKind::WorkEquipment, deductions.work_equipment, step_number);
    steps.push(work_equipment.audit_step);
    step_number += 1;

    let education = calculate_itemized(ItemizedKind::Education, deductions.education, step_number);
    steps.push(education.audit_step);
    step_number += 1;

    // Sonderausgaben
    let church_tax = calculate_church_tax(deductions.church_tax, credits.church_tax_max, step_number);
    steps.push(church_tax.audit_step);
    step_number += 1;

    let donations = calculate_itemized(ItemizedKind::Donations, deductions.donations, step_number);
    steps.push(donations.audit_step);
    step_number += 1;

    // Außergewöhnliche Belastungen
    let medical = calculate_medical(profile, pack.medical(), step_number);
    steps.push(medical.audit_step);
    step_number += 1;

    let childcare = calculate_childcare(
        deductions.childcare_expenses,
        &profile.family.children,
        pack.childcare(),
        year_end,
        step_number,
    );
    steps.push(childcare.audit_step);
    step_number += 1;

    // Totals
    let total_werbungskosten = checked_total(
        "Total Werbungskosten",
        &[
            pendler.entry.amount,
            home_office.entry.amount,
            work_equipment.entry.amount,
            education.entry.amount,
        ],
    )?;
    let werbungskosten_pauschale = credits.werbungskosten_pauschale;
    let pauschale_applied = werbungskosten_pauschale > total_werbungskosten;
    let effective_werbungskosten = total_werbungskosten.max(werbungskosten_pauschale);
    let total_sonderausgaben = checked_total(
        "Total Sonderausgaben",
        &[church_tax.entry.amount, donations.entry.amount],
    )?;
    let total_aussergewoehnliche_belastungen = checked_total(
        "Total außergewöhnliche Belastungen",
        &[medical.entry.deductible, childcare.entry.amount],
    )?;
    let effective_deductions = checked_total(
        "Total deductions",
        &[
            effective_werbungskosten,
            total_sonderausgaben,
            total_aussergewoehnliche_belastungen,
        ],
    )?;

    let totals_reasoning = if pauschale_applied {
        format!(
            "Itemized Werbungskosten €{} below the flat allowance, using €{}; total deductions €{}",
            total_werbungskosten.normalize(),
            werbungskosten_pauschale.normalize(),
            effective_deductions.normalize()
        )
    } else {
        format!(
            "Itemized Werbungskosten €{} exceed the €{} flat allowance; total deductions €{}",
            total_werbungskosten.normalize(),
            werbungskosten_pauschale.normalize(),
            effective_deductions.normalize()
        )
    };
    steps.push(AuditStep {
        step_number,
        rule_id: "deduction_totals".to_string(),
        rule_name: "Deduction Totals".to_string(),
        legal_ref: WERBUNGSKOSTEN_PAUSCHALE_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "total_werbungskosten": total_werbungskosten.normalize().to_string(),
            "werbungskosten_pauschale": werbungskosten_pauschale.normalize().to_string(),
            "total_sonderausgaben": total_sonderausgaben.normalize().to_string(),
            "total_aussergewoehnliche_belastungen": total_aussergewoehnliche_belastungen.normalize().to_string()
        }),
        output: serde_json::json!({
            "effective_werbungskosten": effective_werbungskosten.normalize().to_string(),
            "pauschale_applied": pauschale_applied,
            "effective_deductions": effective_deductions.normalize().to_string()
        }),
        reasoning: totals_reasoning,
    });
    step_number += 1;

    // Taxable income
    let taxable_income =
        checked_difference("Taxable income", gross_income, effective_deductions)?
            .max(Decimal::ZERO);
    steps.push(AuditStep {
        step_number,
        rule_id: "taxable_income".to_string(),
        rule_name: "Taxable Income".to_string(),
        legal_ref: "§ 2 Abs. 2 EStG".to_string(),
        input: serde_json::json!({
            "gross_income": gross_income.normalize().to_string(),
            "effective_deductions": effective_deductions.normalize().to_string()
        }),
        output: serde_json::json!({
            "taxable_income": taxable_income.normalize().to_string()
        }),
        reasoning: format!(
            "€{} - €{} = €{}",
            gross_income.normalize(),
            effective_deductions.normalize(),
            taxable_income.normalize()
        ),
    });
    step_number += 1;

    let tariff = calculate_progressive_tax(taxable_income, pack.tax_brackets(), step_number)?;
    steps.push(tariff.audit_step);
    step_number += 1;

    let absetzbetraege = calculate_absetzbetraege(&profile.family, credits, year_end, step_number);
    steps.push(absetzbetraege.audit_step);
    step_number += 1;

    // Outcome
    let calculated_tax = tariff.tax;
    let tax_after_credits =
        checked_difference("Tax after credits", calculated_tax, absetzbetraege.credits.total)?
            .max(Decimal::ZERO);
    let difference = checked_difference("Refund", withheld_tax, tax_after_credits)?;
    let estimated_refund = difference.max(Decimal::ZERO);
    let estimated_backpayment = (-difference).max(Decimal::ZERO);

    let outcome = if estimated_refund > Decimal::ZERO {
        format!("refund €{}", estimated_refund.normalize())
    } else if estimated_backpayment > Decimal::ZERO {
        format!("backpayment €{}", estimated_backpayment.normalize())
    } else {
        "no refund or backpayment".to_string()
    };
    steps.push(AuditStep {
        step_number,
        rule_id: "final_outcome".to_string(),
        rule_name: "Refund or Backpayment".to_string(),
        legal_ref: "§ 33 EStG".to_string(),
        input: serde_json::json!({
            "calculated_tax": calculated_tax.normalize().to_string(),
            "credits": absetzbetraege.credits.total.normalize().to_string(),
            "withheld_tax": withheld_tax.normalize().to_string()
        }),
        output: serde_json::json!({
            "tax_after_credits": tax_after_credits.normalize().to_string(),
            "estimated_refund": estimated_refund.normalize().to_string(),
            "estimated_backpayment": estimated_backpayment.normalize().to_string()
        }),
        reasoning: format!(
            "Tax €{} less credits €{} = €{}; withheld €{}: {}",
            calculated_tax.normalize(),
            absetzbetraege.credits.total.normalize(),
            tax_after_credits.normalize(),
            withheld_tax.normalize(),
            outcome
        ),
    });

    let breakdown = DeductionBreakdown {
        pendlerpauschale: pendler.entry,
        home_office: home_office.entry,
        work_equipment: work_equipment.entry,
        education: education.entry,
        church_tax: church_tax.entry,
        donations: donations.entry,
        medical: medical.entry,
        childcare: childcare.entry,
        total_werbungskosten,
        werbungskosten_pauschale,
        effective_werbungskosten,
        pauschale_applied,
        total_sonderausgaben,
        total_aussergewoehnliche_belastungen,
        effective_deductions,
    };

    let duration_us = start_time.elapsed().as_micros() as u64;

    let mut result = TaxCalculationResult {
        calculation_id: Uuid::new_v4(),
        calculated_at: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        tax_year: profile.tax_year,
        rule_pack_version: pack.version().to_string(),
        gross_income,
        withheld_tax,
        taxable_income,
        breakdown,
        absetzbetraege: absetzbetraege.credits,
        calculated_tax,
        tax_after_credits,
        estimated_refund,
        estimated_backpayment,
        summary: String::new(),
        audit_trace: AuditTrace {
            steps,
            warnings: collect_warnings(profile, pack),
            duration_us,
        },
    };
    result.summary = fallback_summary(&result);

    info!(
        calculation_id = %result.calculation_id,
        tax_year = result.tax_year,
        rule_pack_version = %result.rule_pack_version,
        taxable_income = %result.taxable_income,
        tax_after_credits = %result.tax_after_credits,
        refund = %result.estimated_refund,
        backpayment = %result.estimated_backpayment,
        duration_us,
        "Tax calculation completed"
    );

    Ok(result)
}

/// Tax calculator with an optional narrative summary collaborator.
#[derive(Clone)]
pub struct TaxCalculator {
    summary_generator: Option<Arc<dyn SummaryGenerator>>,
    summary_timeout: Duration,
}

impl std::fmt::Debug for TaxCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxCalculator")
            .field("has_summary_generator", &self.summary_generator.is_some())
            .field("summary_timeout", &self.summary_timeout)
            .finish()
    }
}

impl Default for TaxCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxCalculator {
    /// Creates a calculator that always uses the deterministic summary.
    pub fn new() -> Self {
        Self {
            summary_generator: None,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
        }
    }

    /// Attaches a summary generator.
    pub fn with_summary_generator(mut self, generator: Arc<dyn SummaryGenerator>) -> Self {
        self.summary_generator = Some(generator);
        self
    }

    /// Sets the upper bound for a summary request.
    pub fn with_summary_timeout(mut self, timeout: Duration) -> Self {
        self.summary_timeout = timeout;
        self
    }

    /// Returns the configured summary timeout.
    pub fn summary_timeout(&self) -> Duration {
        self.summary_timeout
    }

    /// Calculates without contacting the summary generator.
    pub fn calculate(&self, profile: &TaxProfile, pack: &TaxRulePack) -> EngineResult<TaxCalculationResult> {
        calculate_tax(profile, pack)
    }

    /// Calculates and asks the summary generator for a narrative summary.
    ///
    /// The figures are identical to [`TaxCalculator::calculate`]; only the
    /// `summary` field may differ.
    pub async fn calculate_with_summary(
        &self,
        profile: &TaxProfile,
        pack: &TaxRulePack,
    ) -> EngineResult<TaxCalculationResult> {
        let result = calculate_tax(profile, pack)?;
        let summary = generate_or_fallback(
            self.summary_generator.as_deref(),
            &result,
            self.summary_timeout,
        )
        .await;
        Ok(TaxCalculationResult { summary, ..result })
    }
}
