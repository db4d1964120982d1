#![forbid(unsafe_code)]

//! Core domain model and calculation logic for levodopa equivalent daily
//! dose (LEDD) recalculation.
//!
//! This crate provides:
//! - Domain types (catalog entries, prescription lines, patient profile, plans)
//! - Drug catalog management
//! - LEDD aggregation and constraint validation
//! - Schedule synthesis (Plans A, B, C)
//! - Tabular input and report export

pub mod types;
pub mod error;
pub mod time;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod ledd;
pub mod validate;
pub mod schedule;
pub mod plans;
pub mod prescription;
pub mod profile;
pub mod report;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result, ScheduleError};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, load_catalog_csv, DrugCatalog};
pub use config::{Config, ScheduleConfig};
pub use ledd::{aggregate, Aggregation};
pub use validate::{validate, Validation};
pub use schedule::{synthesize, ScheduleStrategy, Synthesis};
pub use prescription::load_prescription_csv;
pub use profile::load_profile;
pub use engine::{recalculate, Recalculation};
