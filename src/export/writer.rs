//! CSV and JSON writers for the vote table.

use crate::models::{RunSummary, Table};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Rendering of the `VoteDate` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// UTF-8 byte order mark, so spreadsheet applications pick the right
/// encoding for the Chinese columns.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Output format for the export file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values (default)
    #[default]
    Csv,
    /// JSON document with the column list and rows
    Json,
}

/// Write the table as CSV: header row, then one row per event.
pub fn write_csv<W: Write>(table: &Table, mut out: W, bom: bool) -> Result<()> {
    if bom {
        out.write_all(UTF8_BOM)?;
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.headers())?;

    for row in &table.rows {
        let date = row.date.format(DATE_FORMAT).to_string();
        writer.write_record(
            [date.as_str(), row.title_ch.as_str(), row.title_en.as_str()]
                .into_iter()
                .chain(row.votes.iter().map(String::as_str)),
        )?;
    }

    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a RunSummary>,
    columns: Vec<String>,
    #[serde(flatten)]
    table: &'a Table,
}

/// Render the table (and optionally the run summary) as pretty JSON.
pub fn generate_json(table: &Table, summary: Option<&RunSummary>) -> Result<String> {
    let export = JsonExport {
        generated_at: Utc::now(),
        summary,
        columns: table.headers(),
        table,
    };
    serde_json::to_string_pretty(&export).map_err(Into::into)
}

/// Write the export file in the requested format.
pub fn save_table(
    table: &Table,
    summary: Option<&RunSummary>,
    path: &Path,
    format: OutputFormat,
    bom: bool,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    match format {
        OutputFormat::Csv => write_csv(table, &mut out, bom),
        OutputFormat::Json => {
            let json = generate_json(table, summary)?;
            out.write_all(json.as_bytes()).map_err(Into::into)
        }
    }
    .with_context(|| format!("Failed to write export file {}", path.display()))?;

    out.flush()
        .with_context(|| format!("Failed to write export file {}", path.display()))?;

    info!(
        "Wrote {} rows x {} members to {}",
        table.rows.len(),
        table.members.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportedRow, MemberId};
    use chrono::NaiveDateTime;

    fn create_test_table() -> Table {
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        Table {
            members: vec![MemberId::new("陳X"), MemberId::new("李Y")],
            rows: vec![
                ExportedRow {
                    date: at("2017-03-01 10:00:00"),
                    title_ch: "動議甲".to_string(),
                    title_en: "Motion A, amended".to_string(),
                    votes: vec!["Yes".to_string(), "-".to_string()],
                },
                ExportedRow {
                    date: at("2017-03-02 11:00:00"),
                    title_ch: "動議乙".to_string(),
                    title_en: "Motion B".to_string(),
                    votes: vec!["-".to_string(), "No".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&create_test_table(), &mut buf, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "VoteDate,VoteTitleTC,VoteTitleEN,陳X,李Y");
        assert_eq!(lines[1], "2017-03-01 10:00:00,動議甲,\"Motion A, amended\",Yes,-");
        assert_eq!(lines[2], "2017-03-02 11:00:00,動議乙,Motion B,-,No");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_csv_with_bom() {
        let mut buf = Vec::new();
        write_csv(&create_test_table(), &mut buf, true).unwrap();
        assert!(buf.starts_with(UTF8_BOM));
        assert!(!buf[3..].starts_with(UTF8_BOM));
    }

    #[test]
    fn test_generate_json() {
        let summary = RunSummary {
            groups: 1,
            documents_listed: 1,
            ..Default::default()
        };
        let json = generate_json(&create_test_table(), Some(&summary)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["columns"][3], "陳X");
        assert_eq!(value["members"][1], "李Y");
        assert_eq!(value["rows"][0]["title_en"], "Motion A, amended");
        assert_eq!(value["rows"][1]["votes"][1], "No");
        assert_eq!(value["summary"]["groups"], 1);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_save_table_formats() {
        let dir = tempfile::tempdir().unwrap();
        let table = create_test_table();

        let csv_path = dir.path().join("vote-result.csv");
        save_table(&table, None, &csv_path, OutputFormat::Csv, true).unwrap();
        let bytes = std::fs::read(&csv_path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let json_path = dir.path().join("vote-result.json");
        save_table(&table, None, &json_path, OutputFormat::Json, true).unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        assert!(text.starts_with('{'));
        assert!(!text.contains("\"summary\""));
    }

    #[test]
    fn test_save_table_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = save_table(&create_test_table(), None, &path, OutputFormat::Csv, false)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create export file"));
    }
}
