//! Taxpayer profile model.
//!
//! This module defines the [`TaxProfile`] supplied by the caller for each
//! calculation, usually assembled by an interview or questionnaire.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Personal circumstances of the taxpayer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    /// Whether the taxpayer has an officially recognised disability.
    #[serde(default)]
    pub has_disability: bool,
    /// Degree of disability in percent, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_degree: Option<u8>,
}

/// Employment income for the year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    /// Annual gross employment income.
    pub gross_income: Decimal,
    /// Wage tax already withheld by employers.
    pub withheld_tax: Decimal,
    /// Number of employers during the year.
    #[serde(default = "default_employer_count")]
    pub employer_count: u32,
    /// Whether the taxpayer also had self-employment income.
    #[serde(default)]
    pub has_self_employment: bool,
}

fn default_employer_count() -> u32 {
    1
}

/// Commuting details for the commuting allowance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuteInfo {
    /// One-way distance between home and work in km.
    #[serde(default)]
    pub distance: Decimal,
    /// Number of commuting days in the year.
    #[serde(default)]
    pub days_per_year: u32,
    /// Whether using public transport is feasible for the trip.
    #[serde(default)]
    pub public_transport_feasible: bool,
}

/// Home office usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeOfficeInfo {
    /// Number of days worked from home.
    #[serde(default)]
    pub days: u32,
}

/// Deductible expenses claimed by the taxpayer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deductions {
    /// Commuting details.
    pub pendlerpauschale: CommuteInfo,
    /// Home office usage.
    pub home_office: HomeOfficeInfo,
    /// Work equipment costs.
    pub work_equipment: Decimal,
    /// Education and training costs.
    pub education: Decimal,
    /// Church contributions paid.
    pub church_tax: Decimal,
    /// Donations to eligible organisations.
    pub donations: Decimal,
    /// Medical expenses not reimbursed.
    pub medical_expenses: Decimal,
    /// Childcare costs paid.
    pub childcare_expenses: Decimal,
}

/// A child of the taxpayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    /// The child's date of birth.
    pub birth_date: NaiveDate,
    /// Whether family allowance (Familienbeihilfe) is received for the child.
    #[serde(default)]
    pub receiving_family_allowance: bool,
    /// Whether the child lives in the taxpayer's household.
    #[serde(default = "default_in_household")]
    pub in_household: bool,
}

fn default_in_household() -> bool {
    true
}

/// Family situation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Family {
    /// Sole earner in a partnership (Alleinverdiener).
    pub single_earner: bool,
    /// Single parent (Alleinerzieher).
    pub single_parent: bool,
    /// The taxpayer's children.
    pub children: Vec<Child>,
}

impl Family {
    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Everything the calculator needs to know about a taxpayer for one year.
///
/// # Example
///
/// ```
/// use tax_rule_engine::models::TaxProfile;
///
/// let json = r#"{
///     "taxYear": 2024,
///     "income": { "grossIncome": "35000", "withheldTax": "5200" }
/// }"#;
/// let profile: TaxProfile = serde_json::from_str(json).unwrap();
/// assert_eq!(profile.income.employer_count, 1);
/// assert!(profile.family.children.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxProfile {
    /// The tax year being assessed.
    pub tax_year: i32,
    /// Personal circumstances.
    #[serde(default)]
    pub personal_info: PersonalInfo,
    /// Employment income.
    pub income: Income,
    /// Claimed deductions.
    #[serde(default)]
    pub deductions: Deductions,
    /// Family situation.
    #[serde(default)]
    pub family: Family,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_full_profile() {
        let json = r#"{
            "taxYear": 2024,
            "personalInfo": { "hasDisability": true, "disabilityDegree": 50 },
            "income": {
                "grossIncome": 42000.50,
                "withheldTax": "6100",
                "employerCount": 2,
                "hasSelfEmployment": false
            },
            "deductions": {
                "pendlerpauschale": { "distance": 25, "daysPerYear": 210, "publicTransportFeasible": false },
                "homeOffice": { "days": 40 },
                "churchTax": 320,
                "medicalExpenses": 1200
            },
            "family": {
                "singleParent": true,
                "children": [
                    { "birthDate": "2015-03-01", "receivingFamilyAllowance": true },
                    { "birthDate": "2003-07-21", "receivingFamilyAllowance": true, "inHousehold": false }
                ]
            }
        }"#;

        let profile: TaxProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.tax_year, 2024);
        assert_eq!(profile.personal_info.disability_degree, Some(50));
        assert_eq!(profile.income.gross_income, dec("42000.5"));
        assert_eq!(profile.income.employer_count, 2);
        assert_eq!(profile.deductions.pendlerpauschale.distance, dec("25"));
        assert_eq!(profile.deductions.home_office.days, 40);
        assert_eq!(profile.deductions.church_tax, dec("320"));
        assert_eq!(profile.deductions.donations, Decimal::ZERO);
        assert!(profile.family.single_parent);
        assert_eq!(profile.family.child_count(), 2);
        assert!(profile.family.children[0].in_household);
        assert!(!profile.family.children[1].in_household);
    }

    #[test]
    fn test_missing_income_is_rejected() {
        let result: Result<TaxProfile, _> = serde_json::from_str(r#"{ "taxYear": 2024 }"#);
        assert!(result.is_err());
    }
}
