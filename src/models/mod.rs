//! Core data models for the tax rule engine.
//!
//! This module contains the taxpayer profile consumed by the calculator and
//! the result types it produces.

mod calculation_result;
mod profile;

pub use calculation_result::{
    Absetzbetraege, AuditStep, AuditTrace, AuditWarning, CappedEntry, ChildcareEntry,
    DeductionBreakdown, HomeOfficeEntry, ItemizedEntry, MedicalEntry, PendlerKind,
    PendlerpauschaleEntry, TaxCalculationResult,
};
pub use profile::{
    Child, CommuteInfo, Deductions, Family, HomeOfficeInfo, Income, PersonalInfo, TaxProfile,
};
