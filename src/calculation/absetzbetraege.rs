//! Tax credits (Absetzbeträge).
//!
//! Credits reduce the tariff tax directly. Every employee gets the traffic
//! and employee credits; sole earners and single parents get a tiered credit
//! by number of children; the family bonus is granted per child receiving
//! family allowance, banded by age at the end of the tax year.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{CreditRules, TieredFamilyCredit};
use crate::models::{Absetzbetraege, AuditStep, Family};

use super::age::age_at;

/// Legal basis of the traffic and employee credits.
pub const EMPLOYEE_CREDITS_LEGAL_REF: &str = "§ 33 Abs. 5 EStG";

/// Legal basis of the sole earner and single parent credits.
pub const FAMILY_CREDITS_LEGAL_REF: &str = "§ 33 Abs. 4 EStG";

/// Legal basis of the family bonus.
pub const FAMILIENBONUS_LEGAL_REF: &str = "§ 33 Abs. 3a EStG";

/// Children below this age get the full family bonus.
pub const FAMILIENBONUS_ADULT_AGE: i32 = 18;

/// Oldest age that still qualifies for the reduced family bonus.
pub const FAMILIENBONUS_MAX_AGE: i32 = 23;

/// The result of the credit calculation.
#[derive(Debug, Clone)]
pub struct AbsetzbetraegeResult {
    /// The credits.
    pub credits: Absetzbetraege,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Returns the tiered credit for `children` children.
///
/// Zero children earn nothing. The first child earns `first_child`, a second
/// adds `second_child_increment`, and each further child adds
/// `additional_child_increment`.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use tax_rule_engine::calculation::tiered_credit;
/// use tax_rule_engine::config::TieredFamilyCredit;
///
/// let credit = TieredFamilyCredit {
///     first_child: Decimal::from(572),
///     second_child_increment: Decimal::from(202),
///     additional_child_increment: Decimal::from(255),
/// };
/// assert_eq!(tiered_credit(&credit, 0), Decimal::ZERO);
/// assert_eq!(tiered_credit(&credit, 1), Decimal::from(572));
/// assert_eq!(tiered_credit(&credit, 3), Decimal::from(1029));
/// ```
pub fn tiered_credit(credit: &TieredFamilyCredit, children: usize) -> Decimal {
    match children {
        0 => Decimal::ZERO,
        1 => credit.first_child,
        n => {
            credit.first_child
                + credit.second_child_increment
                + credit.additional_child_increment * Decimal::from(n - 2)
        }
    }
}

/// Calculates all tax credits for a family situation.
///
/// The sole earner credit takes precedence when both the sole earner and
/// single parent flags are set. Children born after `year_end` are ignored
/// by the family bonus.
pub fn calculate_absetzbetraege(
    family: &Family,
    credits: &CreditRules,
    year_end: NaiveDate,
    step_number: u32,
) -> AbsetzbetraegeResult {
    let child_count = family.child_count();

    let (alleinverdiener, alleinerzieher) = if family.single_earner {
        (tiered_credit(&credits.alleinverdiener, child_count), Decimal::ZERO)
    } else if family.single_parent {
        (Decimal::ZERO, tiered_credit(&credits.alleinerzieher, child_count))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let mut familienbonus_children = 0u32;
    let mut familienbonus_adult_children = 0u32;

    for child in family
        .children
        .iter()
        .filter(|child| child.receiving_family_allowance)
    {
        let age = age_at(child.birth_date, year_end);
        if (0..FAMILIENBONUS_ADULT_AGE).contains(&age) {
            familienbonus_children += 1;
        } else if (FAMILIENBONUS_ADULT_AGE..=FAMILIENBONUS_MAX_AGE).contains(&age) {
            familienbonus_adult_children += 1;
        }
    }

    let familienbonus = credits.familienbonus_per_child * Decimal::from(familienbonus_children)
        + credits.familienbonus_per_child_adult * Decimal::from(familienbonus_adult_children);

    let total = credits.verkehrsabsetzbetrag
        + credits.arbeitnehmerabsetzbetrag
        + alleinverdiener
        + alleinerzieher
        + familienbonus;

    let mut parts = vec![format!(
        "Traffic credit €{} + employee credit €{}",
        credits.verkehrsabsetzbetrag.normalize(),
        credits.arbeitnehmerabsetzbetrag.normalize()
    )];
    if !alleinverdiener.is_zero() {
        parts.push(format!(
            "sole earner credit €{} for {} child(ren)",
            alleinverdiener.normalize(),
            child_count
        ));
    }
    if !alleinerzieher.is_zero() {
        parts.push(format!(
            "single parent credit €{} for {} child(ren)",
            alleinerzieher.normalize(),
            child_count
        ));
    }
    if !familienbonus.is_zero() {
        parts.push(format!(
            "family bonus €{} ({} under 18, {} aged 18-23)",
            familienbonus.normalize(),
            familienbonus_children,
            familienbonus_adult_children
        ));
    }
    let reasoning = format!("{} = €{}", parts.join(" + "), total.normalize());

    let legal_ref = if familienbonus.is_zero() && alleinverdiener.is_zero() && alleinerzieher.is_zero() {
        EMPLOYEE_CREDITS_LEGAL_REF.to_string()
    } else {
        format!(
            "{}; {}; {}",
            EMPLOYEE_CREDITS_LEGAL_REF, FAMILY_CREDITS_LEGAL_REF, FAMILIENBONUS_LEGAL_REF
        )
    };

    let credits_out = Absetzbetraege {
        verkehrsabsetzbetrag: credits.verkehrsabsetzbetrag,
        arbeitnehmerabsetzbetrag: credits.arbeitnehmerabsetzbetrag,
        alleinverdiener,
        alleinerzieher,
        familienbonus,
        familienbonus_children,
        familienbonus_adult_children,
        total,
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "absetzbetraege".to_string(),
        rule_name: "Tax Credits".to_string(),
        legal_ref,
        input: serde_json::json!({
            "single_earner": family.single_earner,
            "single_parent": family.single_parent,
            "children": child_count,
            "reference_date": year_end.to_string()
        }),
        output: serde_json::json!({
            "verkehrsabsetzbetrag": credits.verkehrsabsetzbetrag.normalize().to_string(),
            "arbeitnehmerabsetzbetrag": credits.arbeitnehmerabsetzbetrag.normalize().to_string(),
            "alleinverdiener": alleinverdiener.normalize().to_string(),
            "alleinerzieher": alleinerzieher.normalize().to_string(),
            "familienbonus": familienbonus.normalize().to_string(),
            "total": total.normalize().to_string()
        }),
        reasoning,
    };

    AbsetzbetraegeResult {
        credits: credits_out,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Child;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tiered(first: &str, second: &str, additional: &str) -> TieredFamilyCredit {
        TieredFamilyCredit {
            first_child: dec(first),
            second_child_increment: dec(second),
            additional_child_increment: dec(additional),
        }
    }

    fn rules() -> CreditRules {
        CreditRules {
            werbungskosten_pauschale: dec("132"),
            verkehrsabsetzbetrag: dec("463"),
            arbeitnehmerabsetzbetrag: Decimal::ZERO,
            church_tax_max: dec("600"),
            familienbonus_per_child: dec("2000.16"),
            familienbonus_per_child_adult: dec("700.08"),
            alleinverdiener: tiered("572", "202", "255"),
            alleinerzieher: tiered("572", "202", "255"),
        }
    }

    fn child(y: i32, m: u32, d: u32, allowance: bool) -> Child {
        Child {
            birth_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            receiving_family_allowance: allowance,
            in_household: true,
        }
    }

    fn year_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn test_tiered_credit_grows_per_child() {
        let credit = tiered("572", "202", "255");
        assert_eq!(tiered_credit(&credit, 2), dec("774"));
        assert_eq!(tiered_credit(&credit, 4), dec("1284"));
    }

    #[test]
    fn test_employee_without_family_gets_flat_credits() {
        let result = calculate_absetzbetraege(&Family::default(), &rules(), year_end(), 11);

        assert_eq!(result.credits.total, dec("463"));
        assert_eq!(result.credits.familienbonus, Decimal::ZERO);
        assert_eq!(result.audit_step.legal_ref, EMPLOYEE_CREDITS_LEGAL_REF);
    }

    #[test]
    fn test_single_parent_without_children_gets_no_family_credit() {
        let family = Family {
            single_parent: true,
            ..Family::default()
        };
        let result = calculate_absetzbetraege(&family, &rules(), year_end(), 11);
        assert_eq!(result.credits.alleinerzieher, Decimal::ZERO);
    }

    #[test]
    fn test_single_parent_with_two_children() {
        let family = Family {
            single_parent: true,
            children: vec![child(2015, 3, 1, true), child(2018, 7, 12, true)],
            ..Family::default()
        };
        let result = calculate_absetzbetraege(&family, &rules(), year_end(), 11);

        assert_eq!(result.credits.alleinerzieher, dec("774"));
        assert_eq!(result.credits.alleinverdiener, Decimal::ZERO);
        assert_eq!(result.credits.familienbonus, dec("4000.32"));
        assert_eq!(result.credits.familienbonus_children, 2);
        assert_eq!(result.credits.total, dec("5237.32"));
    }

    #[test]
    fn test_sole_earner_takes_precedence_over_single_parent() {
        let family = Family {
            single_earner: true,
            single_parent: true,
            children: vec![child(2015, 3, 1, false)],
        };
        let result = calculate_absetzbetraege(&family, &rules(), year_end(), 11);

        assert_eq!(result.credits.alleinverdiener, dec("572"));
        assert_eq!(result.credits.alleinerzieher, Decimal::ZERO);
    }

    #[test]
    fn test_family_bonus_age_bands() {
        let family = Family {
            children: vec![
                // 17 at year end
                child(2007, 6, 1, true),
                // turns 18 on year end
                child(2006, 12, 31, true),
                // 23
                child(2001, 1, 1, true),
                // 24
                child(2000, 12, 31, true),
                // no family allowance
                child(2012, 1, 1, false),
                // born after the tax year
                child(2025, 3, 1, true),
            ],
            ..Family::default()
        };
        let result = calculate_absetzbetraege(&family, &rules(), year_end(), 11);

        assert_eq!(result.credits.familienbonus_children, 1);
        assert_eq!(result.credits.familienbonus_adult_children, 2);
        assert_eq!(result.credits.familienbonus, dec("3400.32"));
    }
}
