use crate::db;
use crate::record::{seat_key, Record, Scalar, SEAT_NO_FIELD};
use anyhow::Context;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub rows_total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub warnings: Vec<serde_json::Value>,
}

fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    out.push(buf);
    out
}

/// Spreadsheet exports write integers as `40` or `40.0` and blanks as empty cells.
fn parse_cell(raw: &str) -> Scalar {
    let s = raw.trim();
    if s.is_empty() {
        return Scalar::Null;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Scalar::from(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        if v.is_finite() {
            return Scalar::from_f64(v);
        }
    }
    Scalar::Text(s.to_string())
}

pub fn parse_records_csv(text: &str) -> (Vec<(String, Record)>, Vec<serde_json::Value>, usize) {
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut total = 0usize;
    let mut lines = text.lines().enumerate();

    let Some((_, header_line)) = lines.next() else {
        return (rows, warnings, total);
    };
    let header: Vec<String> = parse_csv_record(header_line.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    if !header.iter().any(|h| h == SEAT_NO_FIELD) {
        warnings.push(json!({
            "line": 1,
            "code": "missing_seat_column",
            "message": "header has no SEAT_NO column"
        }));
        return (rows, warnings, total);
    }

    for (line_no, raw_line) in lines {
        if raw_line.trim().is_empty() {
            continue;
        }
        total += 1;
        let fields = parse_csv_record(raw_line);
        if fields.len() != header.len() {
            warnings.push(json!({
                "line": line_no + 1,
                "code": "bad_columns",
                "message": format!("expected {} CSV columns, found {}", header.len(), fields.len())
            }));
            continue;
        }
        let record: Record = header
            .iter()
            .cloned()
            .zip(fields.iter().map(|f| parse_cell(f)))
            .collect();
        let Some(key) = record.value(SEAT_NO_FIELD).and_then(seat_key) else {
            warnings.push(json!({
                "line": line_no + 1,
                "code": "missing_seat_no",
                "message": "row has no SEAT_NO value"
            }));
            continue;
        };
        rows.push((key, record));
    }
    (rows, warnings, total)
}

/// Loads a student sheet exported as CSV, upserting every row by seat number.
pub fn import_records_csv(conn: &Connection, path: &Path) -> anyhow::Result<ImportSummary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let (rows, warnings, rows_total) = parse_records_csv(&text);

    let tx = conn
        .unchecked_transaction()
        .context("failed to start import transaction")?;
    let mut inserted = 0usize;
    let mut updated = 0usize;
    for (key, record) in &rows {
        let existed = db::upsert_record(&tx, key, record)
            .with_context(|| format!("failed to store seat {}", key))?;
        if existed {
            updated += 1;
        } else {
            inserted += 1;
        }
    }
    tx.commit().context("failed to commit import")?;

    tracing::info!(
        path = %path.to_string_lossy(),
        inserted,
        updated,
        warnings = warnings.len(),
        "student records imported"
    );
    Ok(ImportSummary {
        rows_total,
        inserted,
        updated,
        warnings,
    })
}
