//! Report building and export.
//!
//! A finished `EventLog` becomes a `ReportTable` keyed by elapsed time since
//! stream start, which is then written as CSV, XLSX or index-oriented JSON.

mod export;
mod format;
mod table;

pub use export::{export, IndexOriented, ReportConfig, ReportWriter, DEFAULT_REPORTS_DIR};
pub use format::ReportFormat;
pub use table::{format_elapsed, ReportRow, ReportTable, ReportValues};
