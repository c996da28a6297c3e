//! Calculation logic for the tax rule engine.
//!
//! This module contains one function per tax rule: the commuting allowance,
//! the home office allowance, pass-through and capped expense lines, medical
//! self-retention, childcare caps, the progressive tariff, and tax credits.
//! [`calculate_tax`] runs them in order against a validated rule pack.

mod absetzbetraege;
mod age;
mod calculator;
mod childcare;
mod home_office;
mod itemized;
mod medical;
mod pendlerpauschale;
mod progressive_tax;
mod rounding;
mod summary;

pub use absetzbetraege::{
    AbsetzbetraegeResult, EMPLOYEE_CREDITS_LEGAL_REF, FAMILIENBONUS_ADULT_AGE,
    FAMILIENBONUS_LEGAL_REF, FAMILIENBONUS_MAX_AGE, FAMILY_CREDITS_LEGAL_REF,
    calculate_absetzbetraege, tiered_credit,
};
pub use age::{age_at, tax_year_end};
pub use calculator::{TaxCalculator, WERBUNGSKOSTEN_PAUSCHALE_LEGAL_REF, calculate_tax};
pub use childcare::{CHILDCARE_LEGAL_REF, ChildcareResult, calculate_childcare};
pub use home_office::{HOME_OFFICE_LEGAL_REF, HomeOfficeResult, calculate_home_office};
pub use itemized::{
    CHURCH_TAX_LEGAL_REF, ChurchTaxResult, DONATIONS_LEGAL_REF, EDUCATION_LEGAL_REF,
    ItemizedKind, ItemizedResult, WORK_EQUIPMENT_LEGAL_REF, calculate_church_tax,
    calculate_itemized,
};
pub use medical::{MEDICAL_LEGAL_REF, MedicalResult, SelfRetentionCategory, calculate_medical};
pub use pendlerpauschale::{
    PENDLER_FULL_YEAR_DAYS, PENDLER_MIN_DISTANCE_KM, PENDLERPAUSCHALE_LEGAL_REF,
    PendlerpauschaleResult, calculate_pendlerpauschale, find_pendler_band,
};
pub use progressive_tax::{
    BracketSlice, ProgressiveTaxResult, TARIFF_LEGAL_REF, calculate_progressive_tax,
    progressive_tax,
};
pub use rounding::{round_cents, round_units};
pub use summary::{
    DEFAULT_SUMMARY_TIMEOUT, SummaryError, SummaryGenerator, fallback_summary,
    generate_or_fallback, summary_context, summary_prompt,
};
