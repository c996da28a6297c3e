//! Age computation for child-related rules.
//!
//! Both the childcare cap and the family bonus bands classify children by
//! their age on the last day of the tax year, and both go through
//! [`age_at`] so they agree on birthdays falling on the reference date.

use chrono::{Datelike, NaiveDate};

use crate::error::{EngineError, EngineResult};

/// Returns the age in whole years on `reference`.
///
/// The birthday counts as reached on the day itself. A `birth_date` after
/// `reference` yields a negative age.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tax_rule_engine::calculation::age_at;
///
/// let birth = NaiveDate::from_ymd_opt(2010, 12, 31).unwrap();
/// let year_end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
/// assert_eq!(age_at(birth, year_end), 14);
///
/// let birth = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap();
/// assert_eq!(age_at(birth, year_end), 13);
/// ```
pub fn age_at(birth_date: NaiveDate, reference: NaiveDate) -> i32 {
    let mut age = reference.year() - birth_date.year();
    if (reference.month(), reference.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Returns December 31 of `tax_year`.
pub fn tax_year_end(tax_year: i32) -> EngineResult<NaiveDate> {
    NaiveDate::from_ymd_opt(tax_year, 12, 31).ok_or_else(|| EngineError::CalculationError {
        message: format!("Tax year {} has no representable year end", tax_year),
    })
}
