//! Post-run flow analysis.
//!
//! Flow records collected from the substrate are reduced to a
//! [`MetricsReport`] and rendered as text or JSON.

pub mod metrics;
pub mod report;
pub mod types;

pub use metrics::{compute_report, jain_fairness};
pub use types::{ComparisonReport, FlowRecord, FlowSummary, FullReport, MetricsReport, ReportMetadata};
