//! Workbook loading for the nursery monitor.
//!
//! Turns spreadsheet files (through calamine) or JSON workbook documents into
//! the [`Workbook`] shape consumed by ingestion: sheets in workbook order,
//! the first row of each sheet taken as the header, and every later non-blank
//! row keyed by header name.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Xlsx};
use nursery_core::error::{DashboardError, Result};
use nursery_core::models::{Cell, Row, Sheet, Workbook};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a workbook from disk, dispatching on the file extension.
///
/// `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` go through calamine;
/// `.json` is read as a serialized [`Workbook`].
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let workbook = match extension.as_deref() {
        Some("json") => load_json_workbook(path)?,
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => {
            if !path.exists() {
                return Err(DashboardError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            let mut reader = open_workbook_auto(path).map_err(|e| {
                DashboardError::Spreadsheet(format!("{}: {}", path.display(), e))
            })?;
            read_sheets(&mut reader)
        }
        _ => return Err(DashboardError::UnsupportedFormat(path.to_path_buf())),
    };

    debug!(
        "Loaded {} sheets from {}",
        workbook.sheets.len(),
        path.display()
    );
    Ok(workbook)
}

/// Parse an in-memory `.xlsx` payload, e.g. a downloaded spreadsheet export.
pub fn workbook_from_xlsx_bytes(bytes: Vec<u8>) -> Result<Workbook> {
    let mut reader: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| DashboardError::Spreadsheet(e.to_string()))?;
    Ok(read_sheets(&mut reader))
}

/// Read a JSON workbook document (`{"sheets": [{"name", "rows"}]}`).
pub fn load_json_workbook(path: &Path) -> Result<Workbook> {
    let content = std::fs::read_to_string(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Read every worksheet the reader exposes. Sheets that fail to decode are
/// logged and left out.
fn read_sheets<RS, R>(reader: &mut R) -> Workbook
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let mut sheets = Vec::new();
    for name in reader.sheet_names() {
        match reader.worksheet_range(&name) {
            Ok(range) => {
                let rows = rows_from_range(&range);
                debug!("Sheet {:?}: {} data rows", name, rows.len());
                sheets.push(Sheet { name, rows });
            }
            Err(e) => warn!("Skipping unreadable sheet {:?}: {}", name, e),
        }
    }
    Workbook { sheets }
}

/// Convert a cell range into header-keyed rows.
///
/// Empty header cells drop their column; repeated headers get a `_1`, `_2`
/// ... suffix. Blank rows are skipped.
fn rows_from_range(range: &Range<Data>) -> Vec<Row> {
    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Vec::new();
    };
    let headers = build_headers(header_row);

    rows_iter
        .filter_map(|cells| {
            let row: Row = headers
                .iter()
                .zip(cells.iter())
                .filter_map(|(header, data)| {
                    let header = header.as_ref()?;
                    let cell = data_to_cell(data);
                    if cell.is_empty() {
                        None
                    } else {
                        Some((header.clone(), cell))
                    }
                })
                .collect();
            if row.is_empty() {
                None
            } else {
                Some(row)
            }
        })
        .collect()
}

fn build_headers(header_row: &[Data]) -> Vec<Option<String>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header_row
        .iter()
        .map(|data| {
            let name = data_to_cell(data).to_string();
            if name.is_empty() {
                return None;
            }
            let count = seen.entry(name.clone()).or_insert(0);
            let header = if *count == 0 {
                name
            } else {
                format!("{}_{}", name, count)
            };
            *count += 1;
            Some(header)
        })
        .collect()
}

/// Map a calamine cell onto the workbook [`Cell`].
///
/// Date-formatted cells keep their day serial so the date normaliser sees
/// the same value a plain numeric cell would carry.
fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn range_from(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), value);
            }
        }
        range
    }

    #[test]
    fn test_rows_from_range_uses_header_row() {
        let range = range_from(vec![
            vec![
                Data::String("Data".into()),
                Data::String("Adubação Minijardim".into()),
                Data::String("Adubação plataformas".into()),
            ],
            vec![Data::Float(45_292.0), Data::Int(90), Data::Float(85.5)],
            vec![Data::String("2024-01-08".into()), Data::Empty, Data::Int(70)],
        ]);

        let rows = rows_from_range(&range);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Data"), Some(&Cell::Number(45_292.0)));
        assert_eq!(rows[0].get("Adubação Minijardim"), Some(&Cell::Number(90.0)));
        assert_eq!(rows[0].get("Adubação plataformas"), Some(&Cell::Number(85.5)));
        assert!(rows[1].get("Adubação Minijardim").is_none());
        assert_eq!(rows[1].get("Adubação plataformas"), Some(&Cell::Number(70.0)));
    }

    #[test]
    fn test_rows_from_range_skips_blank_rows() {
        let range = range_from(vec![
            vec![Data::String("Data".into()), Data::String("Caixa de Assepsia".into())],
            vec![Data::Empty, Data::Empty],
            vec![Data::String("2024-02-01".into()), Data::Int(100)],
        ]);
        let rows = rows_from_range(&range);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_build_headers_handles_blank_and_repeated_names() {
        let headers = build_headers(&[
            Data::String("Data".into()),
            Data::Empty,
            Data::String("Nota".into()),
            Data::String("Nota".into()),
        ]);
        assert_eq!(
            headers,
            vec![
                Some("Data".to_string()),
                None,
                Some("Nota".to_string()),
                Some("Nota_1".to_string()),
            ]
        );
    }

    #[test]
    fn test_data_to_cell() {
        assert_eq!(data_to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(data_to_cell(&Data::Bool(true)), Cell::Bool(true));
        assert_eq!(data_to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(
            data_to_cell(&Data::String("ok".into())),
            Cell::Text("ok".to_string())
        );
    }

    #[test]
    fn test_load_json_workbook() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("avaliacoes.json");
        std::fs::write(
            &path,
            r#"{"sheets": [
                {"name": "Irrigação", "rows": [{"Data": "2024-03-01", "Irrigação Minijardim": 95}]},
                {"name": "Notas Gerais"}
            ]}"#,
        )
        .unwrap();

        let wb = load_workbook(&path).expect("load");
        assert_eq!(wb.sheet_names().collect::<Vec<_>>(), vec!["Irrigação", "Notas Gerais"]);
        assert_eq!(wb.sheets[0].rows.len(), 1);
        assert!(wb.sheets[1].rows.is_empty());
    }

    #[test]
    fn test_load_workbook_unsupported_extension() {
        let err = load_workbook(Path::new("/tmp/avaliacoes.txt")).unwrap_err();
        assert!(matches!(err, DashboardError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_workbook_missing_xlsx() {
        let err = load_workbook(Path::new("/nonexistent/avaliacoes.xlsx")).unwrap_err();
        assert!(matches!(err, DashboardError::FileRead { .. }));
    }

    #[test]
    fn test_load_workbook_invalid_json() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            load_workbook(&path),
            Err(DashboardError::JsonParse(_))
        ));
    }

    #[test]
    fn test_workbook_from_garbage_bytes() {
        let err = workbook_from_xlsx_bytes(b"not a zip archive".to_vec()).unwrap_err();
        assert!(matches!(err, DashboardError::Spreadsheet(_)));
    }
}
