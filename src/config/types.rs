//! Rule pack types for tax calculation.
//!
//! This module contains the strongly-typed structures deserialized from the
//! yearly rule pack files, and the validated [`TaxRulePack`] that wraps them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of days after verification before a pack counts as stale, when
/// the pack does not say otherwise.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 35;

/// Provenance information about a rule pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePackMetadata {
    /// The law year the figures were taken from.
    pub law_year: i32,
    /// Free-form verification state, e.g. "verified" or "draft".
    pub verification_status: String,
    /// Optional author notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// URLs of the official sources for the figures.
    pub sources: Vec<String>,
}

/// One band of the progressive income tax tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound of the band (inclusive).
    pub min: Decimal,
    /// Upper bound of the band, `None` for the open-ended top band.
    pub max: Option<Decimal>,
    /// Marginal rate applied inside the band, within `[0, 1]`.
    pub rate: Decimal,
}

/// A family credit that grows with the number of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredFamilyCredit {
    /// Amount for the first child.
    pub first_child: Decimal,
    /// Added when there are at least two children.
    pub second_child_increment: Decimal,
    /// Added for each child beyond the second.
    pub additional_child_increment: Decimal,
}

/// Flat allowances and tax credits (Absetzbeträge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRules {
    /// Flat income-related expense allowance granted when itemized costs are lower.
    pub werbungskosten_pauschale: Decimal,
    /// Traffic credit granted to every employee.
    pub verkehrsabsetzbetrag: Decimal,
    /// Employee credit granted to every employee.
    pub arbeitnehmerabsetzbetrag: Decimal,
    /// Maximum deductible church contribution.
    pub church_tax_max: Decimal,
    /// Family bonus per child under 18.
    pub familienbonus_per_child: Decimal,
    /// Family bonus per child aged 18 to 23.
    pub familienbonus_per_child_adult: Decimal,
    /// Sole earner credit.
    pub alleinverdiener: TieredFamilyCredit,
    /// Single parent credit.
    pub alleinerzieher: TieredFamilyCredit,
}

/// Home office allowance limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeOfficeRules {
    /// Allowance per home office day.
    pub per_day: Decimal,
    /// Annual cap on the allowance.
    pub max_amount: Decimal,
    /// Maximum number of days that count.
    pub max_days: u32,
}

/// Childcare deduction limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildcareRules {
    /// Maximum deductible amount per child living in the household.
    pub max_per_child: Decimal,
    /// Share of the per-child maximum for children outside the household.
    pub shared_custody_factor: Decimal,
    /// Children must be younger than this at year end.
    pub max_age: u32,
}

/// Self-retention (Selbstbehalt) rates for extraordinary medical expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRules {
    /// Rate for taxpayers without a special family situation.
    pub default_rate: Decimal,
    /// Rate for couples with more than three children.
    pub many_children_rate: Decimal,
    /// Rate for sole earners and single parents with exactly two children.
    pub single_two_children_rate: Decimal,
    /// Rate for sole earners and single parents with three or more children.
    pub single_three_or_more_children_rate: Decimal,
    /// Rate for taxpayers with a disability.
    pub disability_rate: Decimal,
}

/// One distance band of a commuting allowance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendlerBracket {
    /// Lower distance bound in km (inclusive).
    pub min_km: Decimal,
    /// Upper distance bound in km (exclusive), `None` for the last band.
    pub max_km: Option<Decimal>,
    /// Annual allowance for a full commuting year.
    pub amount: Decimal,
}

/// The two commuting allowance tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendlerTables {
    /// Used when public transport is feasible.
    pub klein: Vec<PendlerBracket>,
    /// Used when public transport is not feasible.
    pub gross: Vec<PendlerBracket>,
}

/// The raw rule pack document as authored on disk.
///
/// A document is only usable after it passes validation, which turns it
/// into a [`TaxRulePack`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePackDocument {
    /// The tax year the pack applies to.
    pub year: i32,
    /// Author-assigned version string.
    pub version: String,
    /// When the figures were last checked against the sources.
    pub verified_at: String,
    /// Days after `verified_at` before the pack counts as stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_days: Option<i64>,
    /// Provenance information.
    pub metadata: RulePackMetadata,
    /// The progressive tariff, lowest band first.
    pub tax_brackets: Vec<TaxBracket>,
    /// Flat allowances and credits.
    pub credits: CreditRules,
    /// Home office limits.
    pub home_office: HomeOfficeRules,
    /// Childcare limits.
    pub childcare: ChildcareRules,
    /// Medical self-retention rates.
    pub medical: MedicalRules,
    /// Commuting allowance tables.
    pub pendlerpauschale: PendlerTables,
}

/// A validated, immutable rule pack for one tax year.
///
/// Only the validator can construct this type, so every instance satisfies
/// the bracket, table and range invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRulePack {
    document: RulePackDocument,
}

impl TaxRulePack {
    pub(super) fn from_validated(document: RulePackDocument) -> Self {
        Self { document }
    }

    /// Returns the tax year.
    pub fn year(&self) -> i32 {
        self.document.year
    }

    /// Returns the version string.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Returns the raw verification date as written in the pack.
    pub fn verified_at(&self) -> &str {
        &self.document.verified_at
    }

    /// Returns the staleness threshold, falling back to
    /// [`DEFAULT_STALE_AFTER_DAYS`].
    pub fn stale_after_days(&self) -> i64 {
        self.document
            .stale_after_days
            .unwrap_or(DEFAULT_STALE_AFTER_DAYS)
    }

    /// Returns the provenance metadata.
    pub fn metadata(&self) -> &RulePackMetadata {
        &self.document.metadata
    }

    /// Returns the tariff bands, lowest first.
    pub fn tax_brackets(&self) -> &[TaxBracket] {
        &self.document.tax_brackets
    }

    /// Returns the flat allowances and credits.
    pub fn credits(&self) -> &CreditRules {
        &self.document.credits
    }

    /// Returns the home office limits.
    pub fn home_office(&self) -> &HomeOfficeRules {
        &self.document.home_office
    }

    /// Returns the childcare limits.
    pub fn childcare(&self) -> &ChildcareRules {
        &self.document.childcare
    }

    /// Returns the medical self-retention rates.
    pub fn medical(&self) -> &MedicalRules {
        &self.document.medical
    }

    /// Returns the commuting allowance tables.
    pub fn pendlerpauschale(&self) -> &PendlerTables {
        &self.document.pendlerpauschale
    }

    /// Returns the underlying document.
    pub fn document(&self) -> &RulePackDocument {
        &self.document
    }
}
