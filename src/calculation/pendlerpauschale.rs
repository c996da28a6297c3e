//! Commuting allowance (Pendlerpauschale) calculation.
//!
//! The allowance depends on the one-way distance, on whether public
//! transport is feasible, and on the number of commuting days.

use rust_decimal::Decimal;

use crate::config::{PendlerBracket, PendlerTables};
use crate::models::{AuditStep, CommuteInfo, PendlerKind, PendlerpauschaleEntry};

use super::rounding::round_units;

/// Legal basis of the commuting allowance.
pub const PENDLERPAUSCHALE_LEGAL_REF: &str = "§ 16 Abs. 1 Z 6 EStG";

/// Commuting days that earn the full annual amount.
pub const PENDLER_FULL_YEAR_DAYS: u32 = 220;

/// Distances below this many km never qualify.
pub const PENDLER_MIN_DISTANCE_KM: u32 = 2;

/// The result of the commuting allowance calculation.
#[derive(Debug, Clone)]
pub struct PendlerpauschaleResult {
    /// The breakdown entry.
    pub entry: PendlerpauschaleEntry,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Finds the band with `min_km <= distance < max_km`; an open-ended band
/// matches every distance from its `min_km` upwards.
pub fn find_pendler_band(table: &[PendlerBracket], distance: Decimal) -> Option<&PendlerBracket> {
    table.iter().find(|band| {
        distance >= band.min_km && band.max_km.is_none_or(|max_km| distance < max_km)
    })
}

/// Calculates the commuting allowance.
///
/// The `klein` table applies when public transport is feasible, the
/// `gross` table otherwise. The matched band's annual amount is pro-rated by
/// `min(days, 220) / 220` and rounded to whole euros.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::calculate_pendlerpauschale;
/// use tax_rule_engine::config::{PendlerBracket, PendlerTables};
/// use tax_rule_engine::models::{CommuteInfo, PendlerKind};
///
/// let tables = PendlerTables {
///     klein: vec![PendlerBracket { min_km: Decimal::from(20), max_km: None, amount: Decimal::from(696) }],
///     gross: vec![
///         PendlerBracket { min_km: Decimal::from(2), max_km: Some(Decimal::from(20)), amount: Decimal::from(372) },
///         PendlerBracket { min_km: Decimal::from(20), max_km: None, amount: Decimal::from(1476) },
///     ],
/// };
/// let commute = CommuteInfo {
///     distance: Decimal::from(25),
///     days_per_year: 220,
///     public_transport_feasible: false,
/// };
///
/// let result = calculate_pendlerpauschale(&commute, &tables, 1);
/// assert_eq!(result.entry.kind, PendlerKind::Gross);
/// assert_eq!(result.entry.amount, Decimal::from(1476));
/// ```
pub fn calculate_pendlerpauschale(
    commute: &CommuteInfo,
    tables: &PendlerTables,
    step_number: u32,
) -> PendlerpauschaleResult {
    let distance = commute.distance;
    let days = commute.days_per_year;

    let (kind, table) = if commute.public_transport_feasible {
        (PendlerKind::Klein, &tables.klein)
    } else {
        (PendlerKind::Gross, &tables.gross)
    };

    let band = if distance < Decimal::from(PENDLER_MIN_DISTANCE_KM) {
        None
    } else {
        find_pendler_band(table, distance)
    };

    let (kind, annual_amount, amount, reasoning) = match band {
        None => {
            let reasoning = if distance < Decimal::from(PENDLER_MIN_DISTANCE_KM) {
                format!(
                    "Distance {} km is below the {} km minimum - no commuting allowance",
                    distance.normalize(),
                    PENDLER_MIN_DISTANCE_KM
                )
            } else {
                format!(
                    "Distance {} km is below the first band of the {} table - no commuting allowance",
                    distance.normalize(),
                    kind
                )
            };
            (PendlerKind::None, Decimal::ZERO, Decimal::ZERO, reasoning)
        }
        Some(band) => {
            let counted_days = days.min(PENDLER_FULL_YEAR_DAYS);
            let amount = round_units(
                band.amount * Decimal::from(counted_days) / Decimal::from(PENDLER_FULL_YEAR_DAYS),
            );
            let band_label = match band.max_km {
                Some(max_km) => format!("{}-{} km", band.min_km.normalize(), max_km.normalize()),
                None => format!("over {} km", band.min_km.normalize()),
            };
            let reasoning = format!(
                "{} table, band {}: €{} x {}/{} days = €{}",
                kind,
                band_label,
                band.amount.normalize(),
                counted_days,
                PENDLER_FULL_YEAR_DAYS,
                amount.normalize()
            );
            (kind, band.amount, amount, reasoning)
        }
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "pendlerpauschale".to_string(),
        rule_name: "Commuting Allowance".to_string(),
        legal_ref: PENDLERPAUSCHALE_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "distance_km": distance.normalize().to_string(),
            "days_per_year": days,
            "public_transport_feasible": commute.public_transport_feasible
        }),
        output: serde_json::json!({
            "kind": kind.to_string(),
            "annual_amount": annual_amount.normalize().to_string(),
            "amount": amount.normalize().to_string()
        }),
        reasoning: reasoning.clone(),
    };

    let entry = PendlerpauschaleEntry {
        kind,
        distance,
        days_per_year: days,
        annual_amount,
        amount,
        legal_ref: PENDLERPAUSCHALE_LEGAL_REF.to_string(),
        rationale: reasoning,
    };

    PendlerpauschaleResult { entry, audit_step }
}
