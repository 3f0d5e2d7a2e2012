//! Report export.
//!
//! Reports land at `<reports-dir>/face_detection_<YYYYMMDD>.<ext>`, dated by
//! the local wall clock at export time. A second export on the same day
//! overwrites the first.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::format::ReportFormat;
use super::table::ReportTable;

/// Default report directory, relative to the working directory.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

const FILE_PREFIX: &str = "face_detection";
const SHEET_NAME: &str = "Sheet1";
const HEADER: [&str; 3] = ["timestamp", "confidence", "face"];

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub reports_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
        }
    }
}

/// Writes report files into a fixed directory.
pub struct ReportWriter {
    root: PathBuf,
}

impl ReportWriter {
    /// Create the writer, creating the report directory if it is missing.
    pub fn new(cfg: ReportConfig) -> Result<Self> {
        fs::create_dir_all(&cfg.reports_dir).with_context(|| {
            format!(
                "failed to create report directory {}",
                cfg.reports_dir.display()
            )
        })?;
        Ok(Self {
            root: cfg.reports_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination for a report in `format` exported on `date`.
    pub fn destination(&self, format: ReportFormat, date: NaiveDate) -> PathBuf {
        self.root.join(format!(
            "{}_{}.{}",
            FILE_PREFIX,
            date.format("%Y%m%d"),
            format.extension()
        ))
    }

    /// Export `table` to today's destination and return the path written.
    pub fn write(&self, table: &ReportTable, format: ReportFormat) -> Result<PathBuf> {
        let destination = self.destination(format, Local::now().date_naive());
        export(table, format, &destination)?;
        log::info!(
            "report with {} rows written to {}",
            table.len(),
            destination.display()
        );
        Ok(destination)
    }
}

/// Serialize `table` to `destination` in `format`, replacing any existing file.
pub fn export(table: &ReportTable, format: ReportFormat, destination: &Path) -> Result<()> {
    let written = match format {
        ReportFormat::Csv => write_csv(table, destination),
        ReportFormat::Xlsx => write_xlsx(table, destination),
        ReportFormat::Json => write_json(table, destination),
    };
    written.with_context(|| {
        format!(
            "failed to write {} report to {}",
            format,
            destination.display()
        )
    })
}

fn write_csv(table: &ReportTable, destination: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(destination)?;
    writer.write_record(HEADER)?;
    for row in table.rows() {
        writer.serialize((&row.timestamp, row.values.confidence, row.values.face))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(table: &ReportTable, destination: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let bold = Format::new().set_bold();
        for (col, name) in HEADER.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *name, &bold)?;
        }
        for (i, row) in table.rows().iter().enumerate() {
            let r = u32::try_from(i + 1).context("report has too many rows for a worksheet")?;
            sheet.write_string(r, 0, &row.timestamp)?;
            sheet.write_number(r, 1, row.values.confidence)?;
            sheet.write_boolean(r, 2, row.values.face)?;
        }
        sheet.set_column_width(0, 18)?;
    }
    workbook.save(destination)?;
    Ok(())
}

fn write_json(table: &ReportTable, destination: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(destination)?);
    serde_json::to_writer(&mut out, &IndexOriented(table))?;
    out.flush()?;
    Ok(())
}

/// Index-oriented JSON view: `{"<row key>": {"confidence": .., "face": ..}, ..}`.
///
/// Rows are emitted in table order.
pub struct IndexOriented<'a>(pub &'a ReportTable);

impl Serialize for IndexOriented<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for row in self.0.rows() {
            map.serialize_entry(&row.timestamp, &row.values)?;
        }
        map.end()
    }
}
