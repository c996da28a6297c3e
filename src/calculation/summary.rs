//! Narrative summaries of calculation results.
//!
//! A [`SummaryGenerator`] is an optional external text-generation service.
//! Its output is advisory: [`generate_or_fallback`] bounds the call with a
//! timeout and substitutes [`fallback_summary`] on any failure, so the
//! figures never depend on the service.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::TaxCalculationResult;

/// Default upper bound for a summary request.
pub const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors a summary generator can report.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The service could not be reached.
    #[error("Summary service unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The service answered but produced no usable text.
    #[error("Summary generation failed: {message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

/// An external service producing a natural-language summary.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Generates a summary for `prompt`, with the computed figures in `context`.
    async fn generate_summary(
        &self,
        prompt: &str,
        context: &serde_json::Value,
    ) -> Result<String, SummaryError>;
}

fn money(value: Decimal) -> String {
    format!("€{:.2}", value)
}

/// Builds a deterministic summary from the computed figures.
pub fn fallback_summary(result: &TaxCalculationResult) -> String {
    let outcome = if result.estimated_refund > Decimal::ZERO {
        format!("an estimated refund of {}", money(result.estimated_refund))
    } else if result.estimated_backpayment > Decimal::ZERO {
        format!("an estimated backpayment of {}", money(result.estimated_backpayment))
    } else {
        "neither a refund nor a backpayment".to_string()
    };

    format!(
        "For tax year {}, gross income of {} less deductions of {} gives taxable income of {}. \
         Tariff tax of {} less credits of {} leaves {} due against {} withheld, resulting in {}.",
        result.tax_year,
        money(result.gross_income),
        money(result.breakdown.effective_deductions),
        money(result.taxable_income),
        money(result.calculated_tax),
        money(result.absetzbetraege.total),
        money(result.tax_after_credits),
        money(result.withheld_tax),
        outcome
    )
}

/// Builds the prompt sent to a summary generator.
pub fn summary_prompt(result: &TaxCalculationResult) -> String {
    format!(
        "Summarise this Austrian employee tax assessment for tax year {} in two or three plain \
         sentences. Mention the largest deductions and whether the taxpayer can expect a refund \
         or a backpayment. Use only the figures in the context.",
        result.tax_year
    )
}

/// Builds the structured context sent alongside the prompt.
pub fn summary_context(result: &TaxCalculationResult) -> serde_json::Value {
    let breakdown = &result.breakdown;
    serde_json::json!({
        "tax_year": result.tax_year,
        "gross_income": result.gross_income.normalize().to_string(),
        "withheld_tax": result.withheld_tax.normalize().to_string(),
        "deductions": {
            "pendlerpauschale": breakdown.pendlerpauschale.amount.normalize().to_string(),
            "home_office": breakdown.home_office.amount.normalize().to_string(),
            "work_equipment": breakdown.work_equipment.amount.normalize().to_string(),
            "education": breakdown.education.amount.normalize().to_string(),
            "church_tax": breakdown.church_tax.amount.normalize().to_string(),
            "donations": breakdown.donations.amount.normalize().to_string(),
            "medical": breakdown.medical.deductible.normalize().to_string(),
            "childcare": breakdown.childcare.amount.normalize().to_string(),
            "pauschale_applied": breakdown.pauschale_applied,
            "effective": breakdown.effective_deductions.normalize().to_string()
        },
        "taxable_income": result.taxable_income.normalize().to_string(),
        "calculated_tax": result.calculated_tax.normalize().to_string(),
        "credits": result.absetzbetraege.total.normalize().to_string(),
        "tax_after_credits": result.tax_after_credits.normalize().to_string(),
        "estimated_refund": result.estimated_refund.normalize().to_string(),
        "estimated_backpayment": result.estimated_backpayment.normalize().to_string()
    })
}

/// Asks `generator` for a summary, falling back to [`fallback_summary`].
///
/// The fallback is used when no generator is configured, the call fails,
/// the call exceeds `timeout`, or the returned text is blank.
pub async fn generate_or_fallback(
    generator: Option<&dyn SummaryGenerator>,
    result: &TaxCalculationResult,
    timeout: Duration,
) -> String {
    let Some(generator) = generator else {
        return fallback_summary(result);
    };

    let prompt = summary_prompt(result);
    let context = summary_context(result);

    match tokio::time::timeout(timeout, generator.generate_summary(&prompt, &context)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            debug!(calculation_id = %result.calculation_id, "Generated narrative summary");
            text.trim().to_string()
        }
        Ok(Ok(_)) => {
            warn!(calculation_id = %result.calculation_id, "Summary generator returned empty text, using fallback");
            fallback_summary(result)
        }
        Ok(Err(err)) => {
            warn!(calculation_id = %result.calculation_id, error = %err, "Summary generator failed, using fallback");
            fallback_summary(result)
        }
        Err(_) => {
            warn!(
                calculation_id = %result.calculation_id,
                timeout_ms = timeout.as_millis() as u64,
                "Summary generator timed out, using fallback"
            );
            fallback_summary(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::calculate_tax;
    use crate::config::validate_str;
    use crate::models::{Income, TaxProfile};
    use std::str::FromStr;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl SummaryGenerator for FixedGenerator {
        async fn generate_summary(
            &self,
            _prompt: &str,
            _context: &serde_json::Value,
        ) -> Result<String, SummaryError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl SummaryGenerator for FailingGenerator {
        async fn generate_summary(
            &self,
            _prompt: &str,
            _context: &serde_json::Value,
        ) -> Result<String, SummaryError> {
            Err(SummaryError::Unavailable {
                message: "connection refused".to_string(),
            })
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl SummaryGenerator for SlowGenerator {
        async fn generate_summary(
            &self,
            _prompt: &str,
            _context: &serde_json::Value,
        ) -> Result<String, SummaryError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    fn result() -> TaxCalculationResult {
        let pack =
            validate_str(include_str!("../../config/tax-rules/2024.json"), "2024.json").unwrap();
        let profile = TaxProfile {
            tax_year: 2024,
            income: Income {
                gross_income: Decimal::from_str("35000").unwrap(),
                withheld_tax: Decimal::from_str("5000").unwrap(),
                employer_count: 1,
                has_self_employment: false,
            },
            ..TaxProfile::default()
        };
        calculate_tax(&profile, &pack).unwrap()
    }

    #[test]
    fn test_fallback_mentions_outcome() {
        let summary = fallback_summary(&result());
        assert!(summary.starts_with("For tax year 2024"));
        assert!(summary.contains("taxable income of €34868.00"));
        assert!(summary.contains("backpayment of €387.90"));
    }

    #[test]
    fn test_context_carries_figures() {
        let context = summary_context(&result());
        assert_eq!(context["tax_year"], 2024);
        assert_eq!(context["calculated_tax"], "5850.9");
        assert_eq!(context["deductions"]["pauschale_applied"], true);
    }

    #[tokio::test]
    async fn test_generator_text_is_used() {
        let generator = FixedGenerator("  You owe a little.  ");
        let summary =
            generate_or_fallback(Some(&generator), &result(), DEFAULT_SUMMARY_TIMEOUT).await;
        assert_eq!(summary, "You owe a little.");
    }

    #[tokio::test]
    async fn test_no_generator_uses_fallback() {
        let result = result();
        let summary = generate_or_fallback(None, &result, DEFAULT_SUMMARY_TIMEOUT).await;
        assert_eq!(summary, fallback_summary(&result));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let result = result();
        let summary =
            generate_or_fallback(Some(&FailingGenerator), &result, DEFAULT_SUMMARY_TIMEOUT).await;
        assert_eq!(summary, fallback_summary(&result));
    }

    #[tokio::test]
    async fn test_blank_text_uses_fallback() {
        let result = result();
        let generator = FixedGenerator("   ");
        let summary = generate_or_fallback(Some(&generator), &result, DEFAULT_SUMMARY_TIMEOUT).await;
        assert_eq!(summary, fallback_summary(&result));
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback() {
        let result = result();
        let summary =
            generate_or_fallback(Some(&SlowGenerator), &result, Duration::from_millis(50)).await;
        assert_eq!(summary, fallback_summary(&result));
    }
}
