//! Tax rule pack loading, validation, and status checking.
//!
//! Rule packs are yearly JSON (or YAML) documents holding the tariff,
//! allowances, and credits for one tax year. This module validates them,
//! caches them by year, and classifies whether a year's pack is fit for use.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tax_rule_engine::config::{RulePackLoader, RuleStatusChecker};
//!
//! let loader = Arc::new(RulePackLoader::new("./config"));
//! let checker = RuleStatusChecker::new(Arc::clone(&loader));
//!
//! if checker.get_status(2024, None).is_ok() {
//!     let pack = loader.load_rule_pack(2024).unwrap();
//!     println!("Loaded {} brackets", pack.tax_brackets().len());
//! }
//! ```

mod loader;
mod schema;
mod status;
mod types;
mod validator;

pub use loader::{CONFIG_DIR_ENV, RULES_DIR_NAME, RulePackLoader};
pub use schema::schema_issues;
pub use status::{RuleState, RuleStatusChecker, TaxRuleStatus, parse_verification_time};
pub use types::{
    ChildcareRules, CreditRules, DEFAULT_STALE_AFTER_DAYS, HomeOfficeRules, MedicalRules,
    PendlerBracket, PendlerTables, RulePackDocument, RulePackMetadata, TaxBracket, TaxRulePack,
    TieredFamilyCredit,
};
pub use validator::{validate_document, validate_str, validate_value};
