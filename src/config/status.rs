//! Rule pack status checking.
//!
//! The status checker classifies a year's rule pack as usable or not. It
//! never returns an error: every failure becomes a [`RuleState`] with a
//! diagnostic message, and the classification is recomputed against "now"
//! on every call.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::loader::RulePackLoader;

const SECONDS_PER_DAY: i64 = 86_400;

/// Classification of a year's rule pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleState {
    /// The pack loaded, validated, and was verified recently enough.
    Ok,
    /// The pack is valid but its verification is older than its threshold.
    Stale,
    /// No pack file exists for the year.
    Missing,
    /// The year or the pack is malformed.
    Invalid,
    /// The year is not in the list of supported years.
    UnsupportedYear,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleState::Ok => write!(f, "ok"),
            RuleState::Stale => write!(f, "stale"),
            RuleState::Missing => write!(f, "missing"),
            RuleState::Invalid => write!(f, "invalid"),
            RuleState::UnsupportedYear => write!(f, "unsupportedYear"),
        }
    }
}

/// The status of one year's rule pack at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRuleStatus {
    /// The requested year, `None` if the request was not an integer.
    pub year: Option<i32>,
    /// The classification.
    pub state: RuleState,
    /// Human-readable diagnostic.
    pub message: String,
    /// Every supported year, ascending. Empty when the year text was not an
    /// integer, since the directory is not listed then.
    pub supported_years: Vec<i32>,
    /// Path of the pack file, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_path: Option<String>,
    /// Version of the pack, when it loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_version: Option<String>,
    /// Parsed verification timestamp, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// Whole days elapsed since verification, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_verification: Option<i64>,
}

impl TaxRuleStatus {
    fn new(year: Option<i32>, state: RuleState, message: String, supported_years: Vec<i32>) -> Self {
        Self {
            year,
            state,
            message,
            supported_years,
            pack_path: None,
            pack_version: None,
            verified_at: None,
            days_since_verification: None,
        }
    }

    /// Returns true if the pack may be used for calculation.
    pub fn is_ok(&self) -> bool {
        self.state == RuleState::Ok
    }
}

/// Classifies rule packs served by a [`RulePackLoader`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tax_rule_engine::config::{RulePackLoader, RuleStatusChecker};
///
/// let loader = Arc::new(RulePackLoader::discover()?);
/// let checker = RuleStatusChecker::new(loader);
/// let status = checker.get_status(2024, None);
/// println!("2024: {} ({})", status.state, status.message);
/// # Ok::<(), tax_rule_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RuleStatusChecker {
    loader: Arc<RulePackLoader>,
}

impl RuleStatusChecker {
    /// Creates a checker backed by `loader`.
    pub fn new(loader: Arc<RulePackLoader>) -> Self {
        Self { loader }
    }

    /// Returns the loader this checker reads from.
    pub fn loader(&self) -> &Arc<RulePackLoader> {
        &self.loader
    }

    /// Classifies a year given as raw text, e.g. from a form field.
    ///
    /// Text that is not an integer yields [`RuleState::Invalid`] without
    /// touching the filesystem. On that path `supported_years` is left empty
    /// because the directory is never listed; it does not mean no years are
    /// supported.
    pub fn get_status_str(&self, raw_year: &str, now: Option<DateTime<Utc>>) -> TaxRuleStatus {
        match raw_year.trim().parse::<i32>() {
            Ok(year) => self.get_status(year, now),
            Err(_) => {
                debug!(raw_year, "Rejected non-integer tax year");
                TaxRuleStatus::new(
                    None,
                    RuleState::Invalid,
                    format!("Tax year '{}' is not an integer", raw_year),
                    Vec::new(),
                )
            }
        }
    }

    /// Classifies the rule pack for `year` as of `now` (defaults to the
    /// current time).
    ///
    /// Support is checked before any pack file is read, so probing
    /// unsupported years costs a directory listing only.
    pub fn get_status(&self, year: i32, now: Option<DateTime<Utc>>) -> TaxRuleStatus {
        let now = now.unwrap_or_else(Utc::now);
        let status = self.classify(year, now);
        debug!(year, state = %status.state, message = %status.message, "Classified rule pack");
        status
    }

    /// Classifies several years against the same `now`. With `years` unset,
    /// every supported year is classified.
    pub fn get_all_statuses(
        &self,
        years: Option<&[i32]>,
        now: Option<DateTime<Utc>>,
    ) -> Vec<TaxRuleStatus> {
        let now = now.unwrap_or_else(Utc::now);
        let years = match years {
            Some(years) => years.to_vec(),
            None => self.loader.list_supported_years().unwrap_or_default(),
        };

        years
            .into_iter()
            .map(|year| self.get_status(year, Some(now)))
            .collect()
    }

    fn classify(&self, year: i32, now: DateTime<Utc>) -> TaxRuleStatus {
        let supported_years = match self.loader.list_supported_years() {
            Ok(years) => years,
            Err(err) => {
                return TaxRuleStatus::new(
                    Some(year),
                    RuleState::Missing,
                    format!("Rule pack directory is unavailable: {}", err),
                    Vec::new(),
                );
            }
        };

        if !supported_years.contains(&year) {
            let message = format!(
                "Tax year {} is not supported (supported: {})",
                year,
                join_years(&supported_years)
            );
            return TaxRuleStatus::new(
                Some(year),
                RuleState::UnsupportedYear,
                message,
                supported_years,
            );
        }

        let pack_path = self
            .loader
            .pack_path(year)
            .map(|p| p.display().to_string());

        let pack = match self.loader.load_rule_pack(year) {
            Ok(pack) => pack,
            Err(err) => {
                let state = if err.is_missing() {
                    RuleState::Missing
                } else {
                    RuleState::Invalid
                };
                let mut status =
                    TaxRuleStatus::new(Some(year), state, err.to_string(), supported_years);
                status.pack_path = pack_path;
                return status;
            }
        };

        let mut status = TaxRuleStatus::new(
            Some(year),
            RuleState::Ok,
            String::new(),
            supported_years,
        );
        status.pack_path = pack_path;
        status.pack_version = Some(pack.version().to_string());

        let Some(verified_at) = parse_verification_time(pack.verified_at()) else {
            status.state = RuleState::Invalid;
            status.message = format!(
                "Rule pack {} has an unparsable verifiedAt '{}'",
                year,
                pack.verified_at()
            );
            return status;
        };

        let days = days_between(verified_at, now);
        let threshold = pack.stale_after_days();
        status.verified_at = Some(verified_at);
        status.days_since_verification = Some(days);

        if days > threshold {
            status.state = RuleState::Stale;
            status.message = format!(
                "Rule pack {} (version {}) was verified {} days ago, exceeding the {}-day threshold",
                year,
                pack.version(),
                days,
                threshold
            );
        } else {
            status.message = format!(
                "Rule pack {} (version {}) verified {} days ago",
                year,
                pack.version(),
                days
            );
        }

        status
    }
}

/// Parses a verification timestamp written as `YYYY-MM-DD` or RFC 3339.
pub fn parse_verification_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole days from `from` to `to`, rounded down.
fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn join_years(years: &[i32]) -> String {
    if years.is_empty() {
        return "none".to_string();
    }
    years
        .iter()
        .map(|y| y.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
