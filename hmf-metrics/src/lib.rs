//! High-magnitude flow (HMF) metrics for daily streamflow records.
//!
//! A site's discharge series flows strictly downstream through:
//!
//! ```text
//! completeness ─┐
//! threshold ────┴─> segment ─> annual ─┬─> trend
//!                                      └─> seasonal
//!                                           └─> assemble (SiteMetricRecord + trend rows)
//! ```
//!
//! Every step takes an [`config::AnalysisConfig`] by reference; nothing here
//! keeps state between sites.

pub mod annual;
pub mod assemble;
pub mod completeness;
pub mod config;
pub mod error;
pub mod seasonal;
pub mod segment;
pub mod threshold;
pub mod trend;

pub use assemble::{analyze_site, SiteAnalysis, SiteMetricRecord};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
