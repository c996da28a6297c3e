//! Application context tying the rule pack loader, status checker, and
//! calculator together.
//!
//! Every operation that depends on a year's rules goes through
//! [`TaxEngine::ensure_ready`], which refuses to proceed unless the year's
//! status is `ok`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::calculation::TaxCalculator;
use crate::config::{RulePackLoader, RuleStatusChecker, TaxRulePack, TaxRuleStatus};
use crate::error::{EngineError, EngineResult};
use crate::models::{TaxCalculationResult, TaxProfile};

/// Operations gated on a fresh rule pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Computing the annual tax.
    CalculateTax,
    /// Filling in the tax return form.
    GenerateForm,
    /// Producing the step-by-step filing guide.
    GenerateGuide,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CalculateTax => write!(f, "calculate tax"),
            Operation::GenerateForm => write!(f, "generate the tax form"),
            Operation::GenerateGuide => write!(f, "generate the filing guide"),
        }
    }
}

/// Shared engine state.
///
/// Cloning is cheap; clones share the loader and its cache.
///
/// # Example
///
/// ```no_run
/// use tax_rule_engine::TaxEngine;
/// use tax_rule_engine::models::TaxProfile;
///
/// let engine = TaxEngine::discover()?;
/// let profile: TaxProfile = serde_json::from_str(
///     r#"{ "taxYear": 2025, "income": { "grossIncome": "42000", "withheldTax": "7200" } }"#,
/// ).unwrap();
///
/// let result = engine.calculate(&profile, None)?;
/// println!("{}", result.summary);
/// # Ok::<(), tax_rule_engine::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TaxEngine {
    loader: Arc<RulePackLoader>,
    checker: RuleStatusChecker,
    calculator: TaxCalculator,
}

impl TaxEngine {
    /// Creates an engine around `loader` with a default calculator.
    pub fn new(loader: RulePackLoader) -> Self {
        let loader = Arc::new(loader);
        Self {
            checker: RuleStatusChecker::new(Arc::clone(&loader)),
            loader,
            calculator: TaxCalculator::new(),
        }
    }

    /// Creates an engine using [`RulePackLoader::discover`].
    pub fn discover() -> EngineResult<Self> {
        Ok(Self::new(RulePackLoader::discover()?))
    }

    /// Replaces the calculator, e.g. to attach a summary generator.
    pub fn with_calculator(mut self, calculator: TaxCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    /// Returns the rule pack loader.
    pub fn loader(&self) -> &Arc<RulePackLoader> {
        &self.loader
    }

    /// Returns the calculator.
    pub fn calculator(&self) -> &TaxCalculator {
        &self.calculator
    }

    /// Returns the status of `year` at `now` (defaults to the current time).
    pub fn status(&self, year: i32, now: Option<DateTime<Utc>>) -> TaxRuleStatus {
        self.checker.get_status(year, now)
    }

    /// Returns the status for a year given as raw text.
    pub fn status_str(&self, raw_year: &str, now: Option<DateTime<Utc>>) -> TaxRuleStatus {
        self.checker.get_status_str(raw_year, now)
    }

    /// Returns the status of every year in `years`, or of every supported year.
    pub fn all_statuses(&self, years: Option<&[i32]>, now: Option<DateTime<Utc>>) -> Vec<TaxRuleStatus> {
        self.checker.get_all_statuses(years, now)
    }

    /// Returns the rule pack for `year` if its status is `ok`.
    ///
    /// # Errors
    ///
    /// Returns `OperationBlocked` naming the operation, the year, and the
    /// status when the status is anything else.
    pub fn ensure_ready(
        &self,
        year: i32,
        operation: Operation,
        now: Option<DateTime<Utc>>,
    ) -> EngineResult<Arc<TaxRulePack>> {
        let status = self.checker.get_status(year, now);

        if !status.is_ok() {
            warn!(
                year,
                operation = %operation,
                state = %status.state,
                "Blocked operation on unusable rule pack"
            );
            return Err(EngineError::OperationBlocked {
                operation: operation.to_string(),
                year,
                state: status.state.to_string(),
                message: status.message,
            });
        }

        debug!(year, operation = %operation, "Rule pack ready");
        self.loader.load_rule_pack(year)
    }

    /// Calculates tax for `profile` after gating on the year's status.
    pub fn calculate(
        &self,
        profile: &TaxProfile,
        now: Option<DateTime<Utc>>,
    ) -> EngineResult<TaxCalculationResult> {
        let pack = self.ensure_ready(profile.tax_year, Operation::CalculateTax, now)?;
        self.calculator.calculate(profile, &pack)
    }

    /// Like [`TaxEngine::calculate`], with a narrative summary.
    pub async fn calculate_with_summary(
        &self,
        profile: &TaxProfile,
        now: Option<DateTime<Utc>>,
    ) -> EngineResult<TaxCalculationResult> {
        let pack = self.ensure_ready(profile.tax_year, Operation::CalculateTax, now)?;
        self.calculator.calculate_with_summary(profile, &pack).await
    }
}
