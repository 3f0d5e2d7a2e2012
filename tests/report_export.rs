use anyhow::Result;
use calamine::{open_workbook, Data, Reader, Xlsx};
use tempfile::TempDir;

use face_report::report::{export, ReportValues};
use face_report::{DetectionEvent, EventLog, ReportConfig, ReportFormat, ReportTable, ReportWriter};

fn sample_log() -> EventLog {
    EventLog::from_entries(vec![
        DetectionEvent::stream_start(0.0),
        DetectionEvent::face(1000.0, 0.87),
        DetectionEvent::face(2500.0, 0.51),
        DetectionEvent::face(2500.0, 0.64),
        DetectionEvent::face(3_600_000.0, 0.99),
    ])
}

#[test]
fn csv_report_reads_back_with_header_and_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("report.csv");
    export(&ReportTable::build(&sample_log()), ReportFormat::Csv, &path)?;

    let mut reader = csv::Reader::from_path(&path)?;
    assert_eq!(
        reader.headers()?.iter().collect::<Vec<_>>(),
        vec!["timestamp", "confidence", "face"]
    );
    let rows: Vec<(String, f64, bool)> = reader.deserialize().collect::<Result<_, _>>()?;
    assert_eq!(
        rows,
        vec![
            ("0:00:01.000000".to_string(), 0.87, true),
            ("0:00:02.500000".to_string(), 0.64, true),
            ("1:00:00.000000".to_string(), 0.99, true),
        ]
    );
    Ok(())
}

#[test]
fn json_report_is_index_oriented_in_row_order() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("report.json");
    export(&ReportTable::build(&sample_log()), ReportFormat::Json, &path)?;

    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with(r#"{"0:00:01.000000":{"confidence":0.87,"face":true}"#));

    let value: serde_json::Value = serde_json::from_str(&text)?;
    let object = value.as_object().expect("top-level object");
    assert_eq!(object.len(), 3);
    assert_eq!(
        value["0:00:02.500000"],
        serde_json::json!({"confidence": 0.64, "face": true})
    );
    let row: ReportValues = serde_json::from_value(value["1:00:00.000000"].clone())?;
    assert_eq!(row.confidence, 0.99);
    assert!(row.face);
    Ok(())
}

#[test]
fn empty_json_report_is_an_empty_object() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("empty.json");
    export(&ReportTable::new(), ReportFormat::Json, &path)?;
    assert_eq!(std::fs::read_to_string(&path)?, "{}");
    Ok(())
}

#[test]
fn xlsx_report_has_one_sheet_with_header_and_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let writer = ReportWriter::new(ReportConfig {
        reports_dir: dir.path().to_path_buf(),
    })?;
    let path = writer.write(&ReportTable::build(&sample_log()), ReportFormat::Xlsx)?;
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));

    let mut workbook: Xlsx<_> = open_workbook(&path)?;
    assert_eq!(workbook.sheet_names(), vec!["Sheet1".to_string()]);

    let range = workbook.worksheet_range("Sheet1")?;
    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    let text = |s: &str| Data::String(s.to_string());
    assert_eq!(
        rows,
        vec![
            vec![text("timestamp"), text("confidence"), text("face")],
            vec![text("0:00:01.000000"), Data::Float(0.87), Data::Bool(true)],
            vec![text("0:00:02.500000"), Data::Float(0.64), Data::Bool(true)],
            vec![text("1:00:00.000000"), Data::Float(0.99), Data::Bool(true)],
        ]
    );
    Ok(())
}

#[test]
fn empty_xlsx_report_keeps_the_header() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("empty.xlsx");
    export(&ReportTable::new(), ReportFormat::Xlsx, &path)?;

    let mut workbook: Xlsx<_> = open_workbook(&path)?;
    let range = workbook.worksheet_range("Sheet1")?;
    assert_eq!(range.height(), 1);
    assert_eq!(range.get((0, 0)), Some(&Data::String("timestamp".to_string())));
    Ok(())
}

#[test]
fn writer_creates_missing_nested_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().join("out/reports");
    assert!(!root.exists());
    let writer = ReportWriter::new(ReportConfig {
        reports_dir: root.clone(),
    })?;
    assert!(root.is_dir());
    assert_eq!(writer.root(), root.as_path());
    Ok(())
}

#[test]
fn unknown_format_is_rejected_before_anything_is_written() {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().join("reports");

    let err = "pdf".parse::<ReportFormat>().expect_err("pdf is not a report format");
    assert!(err.to_string().contains("expected one of: csv, xlsx, json"));
    assert!(!root.exists());
}
