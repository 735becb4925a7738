//! Incoming quality control (IQC) statistics over inspection-sheet exports.
//!
//! A sheet goes through three stages:
//! - [`layout::classify`] picks the column layout from the header row,
//! - [`normalizer::normalize`] projects data rows into [`types::CanonicalRecord`]s,
//! - [`reports::aggregate`] derives the summary, monthly buckets and trend,
//!   the Friday-Thursday week comparison, supplier ranking and defect
//!   distribution.
//!
//! [`pipeline::process_iqc_data`] runs all three; [`pipeline::recalculate`]
//! re-filters records cached from an earlier run.
pub mod cli;
pub mod comparison;
pub mod config;
pub mod error;
pub mod keywords;
pub mod layout;
pub mod loader;
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod types;
pub mod util;
pub mod week;

pub use error::{IqcError, Result};
pub use pipeline::{process_iqc_data, recalculate};
