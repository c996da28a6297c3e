//! Tax Rule Engine for Austrian employee assessments
//!
//! This crate loads yearly, versioned tax rule packs, checks that they are
//! valid and fresh, and calculates annual income tax, credits, and the
//! expected refund or backpayment from a taxpayer profile.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;

pub use engine::TaxEngine;
pub use error::{EngineError, EngineResult};
