//! Ingestion normalizer: workbook sheets to [`EvaluationRecord`]s.
//!
//! Each sheet is matched to a configured process by name, every row's date
//! is normalised, and every configured parameter column present on the row
//! becomes one record. Unreadable dates and non-numeric cells are resolved
//! through [`InvalidDatePolicy`] and [`InvalidValuePolicy`].

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use nursery_core::error::{DashboardError, Result};
use nursery_core::models::{
    Cell, EvaluationRecord, InvalidDatePolicy, InvalidValuePolicy, Row, Sheet, Workbook,
};
use nursery_core::processes::{ProcessConfig, ProcessDefinition};
use nursery_core::time_utils::{normalize_date, DateOutcome};

/// Column names holding the inspection date, in lookup order.
pub const DATE_COLUMNS: [&str; 2] = ["Data", "DATA"];

// ── Options & results ─────────────────────────────────────────────────────────

/// Inputs to [`ingest_workbook`] beyond the workbook and process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Processing day; stands in for rows without a date.
    pub today: NaiveDate,
    pub invalid_dates: InvalidDatePolicy,
    pub invalid_values: InvalidValuePolicy,
}

impl IngestOptions {
    /// Options with the default policies.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            invalid_dates: InvalidDatePolicy::default(),
            invalid_values: InvalidValuePolicy::default(),
        }
    }

    pub fn with_policies(
        mut self,
        invalid_dates: InvalidDatePolicy,
        invalid_values: InvalidValuePolicy,
    ) -> Self {
        self.invalid_dates = invalid_dates;
        self.invalid_values = invalid_values;
        self
    }
}

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestMetadata {
    pub sheets_total: usize,
    pub sheets_matched: usize,
    pub rows_processed: usize,
    /// Rows without a date cell, dated with the processing day.
    pub rows_defaulted_date: usize,
    /// Rows with an unreadable date that the policy dropped.
    pub rows_skipped_invalid_date: usize,
    /// Non-numeric cells, however the policy resolved them.
    pub invalid_cells: usize,
    pub records_emitted: usize,
}

/// The output of [`ingest_workbook`].
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    /// Records in sheet, row, then parameter order.
    pub records: Vec<EvaluationRecord>,
    pub metadata: IngestMetadata,
}

/// A cell that does not hold a finite number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a number: {0:?}")]
pub struct InvalidNumber(pub String);

// ── Matching & coercion ───────────────────────────────────────────────────────

/// Resolve a sheet name to its process.
///
/// Names are compared case-insensitively and either may contain the other.
/// The first configured process that matches wins; when that process is
/// reserved the sheet maps to nothing.
pub fn match_sheet_to_process<'a>(
    sheet_name: &str,
    config: &'a ProcessConfig,
) -> Option<&'a ProcessDefinition> {
    let sheet = sheet_name.to_lowercase();
    let first = config.all().iter().find(|p| {
        let name = p.name.to_lowercase();
        sheet.contains(&name) || name.contains(&sheet)
    })?;
    if first.is_reserved() {
        None
    } else {
        Some(first)
    }
}

/// Coerce a parameter cell into a score.
///
/// Numbers pass through. Text is trimmed, a trailing `%` is ignored and a
/// lone comma is read as the decimal separator (`"87,5"`).
pub fn coerce_cell(cell: &Cell) -> std::result::Result<f64, InvalidNumber> {
    let value = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(raw) => parse_number(raw),
        Cell::Bool(_) | Cell::Empty => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| InvalidNumber(cell.to_string()))
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
        return trimmed.replace(',', ".").parse().ok();
    }
    trimmed.parse().ok()
}

fn date_cell(row: &Row) -> Option<&Cell> {
    DATE_COLUMNS.iter().find_map(|column| row.get(column))
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

/// Normalise every matched sheet of `workbook` into evaluation records.
///
/// Fails only under [`InvalidValuePolicy::Reject`], on the first non-numeric
/// parameter cell.
pub fn ingest_workbook(
    workbook: &Workbook,
    config: &ProcessConfig,
    options: &IngestOptions,
) -> Result<IngestResult> {
    let mut result = IngestResult::default();
    result.metadata.sheets_total = workbook.sheets.len();

    for sheet in &workbook.sheets {
        let Some(process) = match_sheet_to_process(&sheet.name, config) else {
            debug!("Sheet {:?} matches no trackable process, skipping", sheet.name);
            continue;
        };
        result.metadata.sheets_matched += 1;
        let before = result.records.len();
        ingest_sheet(sheet, process, options, &mut result)?;
        debug!(
            "Sheet {:?} -> {:?}: {} records",
            sheet.name,
            process.name,
            result.records.len() - before
        );
    }

    result.metadata.records_emitted = result.records.len();
    info!(
        "Ingested {} records from {}/{} sheets",
        result.metadata.records_emitted, result.metadata.sheets_matched, result.metadata.sheets_total
    );
    Ok(result)
}

fn ingest_sheet(
    sheet: &Sheet,
    process: &ProcessDefinition,
    options: &IngestOptions,
    result: &mut IngestResult,
) -> Result<()> {
    for row in &sheet.rows {
        result.metadata.rows_processed += 1;

        let date = match normalize_date(date_cell(row), options.today) {
            DateOutcome::Parsed(d) => d,
            DateOutcome::Defaulted(d) => {
                result.metadata.rows_defaulted_date += 1;
                d
            }
            DateOutcome::Invalid(raw) => match options.invalid_dates {
                InvalidDatePolicy::Skip => {
                    warn!("Sheet {:?}: unreadable date {:?}, row skipped", sheet.name, raw);
                    result.metadata.rows_skipped_invalid_date += 1;
                    continue;
                }
                InvalidDatePolicy::Today => {
                    warn!("Sheet {:?}: unreadable date {:?}, using today", sheet.name, raw);
                    result.metadata.rows_defaulted_date += 1;
                    options.today
                }
            },
        };

        for parameter in &process.parameters {
            let Some(cell) = row.get(parameter) else {
                continue;
            };
            let value = match coerce_cell(cell) {
                Ok(v) => v,
                Err(InvalidNumber(raw)) => {
                    result.metadata.invalid_cells += 1;
                    match options.invalid_values {
                        InvalidValuePolicy::Drop => {
                            warn!(
                                "Sheet {:?}, column {:?}: non-numeric value {:?} dropped",
                                sheet.name, parameter, raw
                            );
                            continue;
                        }
                        InvalidValuePolicy::Zero => 0.0,
                        InvalidValuePolicy::Reject => {
                            return Err(DashboardError::InvalidCellValue {
                                sheet: sheet.name.clone(),
                                column: parameter.clone(),
                                raw,
                            });
                        }
                    }
                }
            };
            result
                .records
                .push(EvaluationRecord::new(date, &process.name, parameter, value));
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use nursery_core::models::Unit;
    use nursery_core::processes::ProcessDefinition;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options() -> IngestOptions {
        IngestOptions::new(date(2024, 6, 15))
    }

    fn sheet(name: &str, rows: Vec<Row>) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows,
        }
    }

    #[test]
    fn test_match_is_case_insensitive_both_directions() {
        let config = ProcessConfig::nursery();
        assert_eq!(
            match_sheet_to_process("ADUBAÇÃO", &config).map(|p| p.name.as_str()),
            Some("Adubação")
        );
        assert_eq!(
            match_sheet_to_process("Avaliação Irrigação 2024", &config).map(|p| p.name.as_str()),
            Some("Irrigação")
        );
        assert_eq!(
            match_sheet_to_process("expedi", &config).map(|p| p.name.as_str()),
            Some("Expedição")
        );
    }

    #[test]
    fn test_match_first_configured_wins() {
        let config = ProcessConfig::new(vec![
            ProcessDefinition::new("Casa de vegetação - Sobrevivência", &["% de sobrevivência"]),
            ProcessDefinition::new("Casa de vegetação", &["Umidade"]),
        ]);
        assert_eq!(
            match_sheet_to_process("casa de vegetação", &config).map(|p| p.name.as_str()),
            Some("Casa de vegetação - Sobrevivência")
        );
    }

    #[test]
    fn test_match_never_returns_reserved() {
        let config = ProcessConfig::nursery();
        assert!(match_sheet_to_process("Visão Geral", &config).is_none());
        assert!(match_sheet_to_process("administração", &config).is_none());
        assert!(match_sheet_to_process("Resumo", &config).is_none());
    }

    #[test]
    fn test_match_uppercase_sheet_with_suffix() {
        let config = ProcessConfig::nursery();
        assert_eq!(
            match_sheet_to_process("ADUBAÇÃO - FEV", &config).map(|p| p.name.as_str()),
            Some("Adubação")
        );
    }

    #[test]
    fn test_match_unrelated_sheet_is_none() {
        let config = ProcessConfig::nursery();
        assert!(match_sheet_to_process("Notas Gerais", &config).is_none());
    }

    #[test]
    fn test_coerce_cell() {
        assert_eq!(coerce_cell(&Cell::Number(87.5)), Ok(87.5));
        assert_eq!(coerce_cell(&Cell::Text(" 92 ".into())), Ok(92.0));
        assert_eq!(coerce_cell(&Cell::Text("87,5".into())), Ok(87.5));
        assert_eq!(coerce_cell(&Cell::Text("95%".into())), Ok(95.0));
        assert!(coerce_cell(&Cell::Text("n/a".into())).is_err());
        assert!(coerce_cell(&Cell::Text("NaN".into())).is_err());
        assert!(coerce_cell(&Cell::Bool(true)).is_err());
        assert!(coerce_cell(&Cell::Number(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_ingest_emits_one_record_per_present_parameter() {
        let workbook = Workbook {
            sheets: vec![sheet(
                "Adubação",
                vec![
                    Row::new()
                        .with("Data", Cell::Number(45_292.0))
                        .with("Adubação Minijardim", Cell::Number(80.0))
                        .with("Adubação plataformas", Cell::Text("100".into()))
                        .with("Comentário", Cell::Text("ok".into())),
                    Row::new()
                        .with("DATA", Cell::Text("2024-01-08".into()))
                        .with("Adubação Minijardim", Cell::Number(90.0)),
                ],
            )],
        };

        let result = ingest_workbook(&workbook, &ProcessConfig::nursery(), &options()).unwrap();
        let records = &result.records;
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].date, date(2024, 1, 1));
        assert_eq!(records[0].week, 1);
        assert_eq!(records[0].month, 1);
        assert_eq!(records[0].process, "Adubação");
        assert_eq!(records[0].parameter, "Adubação Minijardim");
        assert_eq!(records[1].parameter, "Adubação plataformas");
        assert_eq!(records[1].value, 100.0);
        assert_eq!(records[2].date, date(2024, 1, 8));
        assert_eq!(records[2].week, 2);
        assert_eq!(result.metadata.records_emitted, 3);
    }

    #[test]
    fn test_ingest_missing_date_uses_today() {
        let workbook = Workbook {
            sheets: vec![sheet(
                "Transporte de estacas",
                vec![Row::new().with("% de aproveitamento", Cell::Number(97.0))],
            )],
        };
        let result = ingest_workbook(&workbook, &ProcessConfig::nursery(), &options()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].date, date(2024, 6, 15));
        assert_eq!(result.records[0].unit, Unit::Percent);
        assert_eq!(result.metadata.rows_defaulted_date, 1);
    }

    #[test]
    fn test_ingest_skips_unmatched_and_reserved_sheets() {
        let row = Row::new()
            .with("Data", Cell::Text("2024-02-01".into()))
            .with("Irrigação Minijardim", Cell::Number(90.0));
        let workbook = Workbook {
            sheets: vec![
                sheet("Visão Geral", vec![row.clone()]),
                sheet("Planilha1", vec![row.clone()]),
                sheet("Irrigação", vec![row]),
            ],
        };
        let result = ingest_workbook(&workbook, &ProcessConfig::nursery(), &options()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.metadata.sheets_total, 3);
        assert_eq!(result.metadata.sheets_matched, 1);
        assert!(result.records.iter().all(|r| r.process == "Irrigação"));
    }

    #[test]
    fn test_ingest_invalid_date_policies() {
        let workbook = Workbook {
            sheets: vec![sheet(
                "Enchimento de Bandejas - Limpeza",
                vec![Row::new()
                    .with("Data", Cell::Text("ontem".into()))
                    .with("Caixa de Assepsia", Cell::Number(100.0))],
            )],
        };
        let config = ProcessConfig::nursery();

        let skipped = ingest_workbook(&workbook, &config, &options()).unwrap();
        assert!(skipped.records.is_empty());
        assert_eq!(skipped.metadata.rows_skipped_invalid_date, 1);

        let today = options().with_policies(InvalidDatePolicy::Today, InvalidValuePolicy::Drop);
        let dated = ingest_workbook(&workbook, &config, &today).unwrap();
        assert_eq!(dated.records.len(), 1);
        assert_eq!(dated.records[0].date, date(2024, 6, 15));
    }

    #[test]
    fn test_ingest_invalid_value_policies() {
        let workbook = Workbook {
            sheets: vec![sheet(
                "Estaqueamento",
                vec![Row::new()
                    .with("Data", Cell::Text("2024-04-02".into()))
                    .with("Estaca verde", Cell::Text("sem avaliação".into()))
                    .with("Folha aterrada", Cell::Number(85.0))],
            )],
        };
        let config = ProcessConfig::nursery();

        let dropped = ingest_workbook(&workbook, &config, &options()).unwrap();
        assert_eq!(dropped.records.len(), 1);
        assert_eq!(dropped.records[0].parameter, "Folha aterrada");
        assert_eq!(dropped.metadata.invalid_cells, 1);

        let zero = options().with_policies(InvalidDatePolicy::Skip, InvalidValuePolicy::Zero);
        let zeroed = ingest_workbook(&workbook, &config, &zero).unwrap();
        assert_eq!(zeroed.records.len(), 2);
        assert_eq!(zeroed.records[0].value, 0.0);

        let reject = options().with_policies(InvalidDatePolicy::Skip, InvalidValuePolicy::Reject);
        let err = ingest_workbook(&workbook, &config, &reject).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidCellValue { ref column, .. } if column == "Estaca verde"
        ));
    }

    #[test]
    fn test_ingest_only_configured_parameters() {
        let config = ProcessConfig::new(vec![ProcessDefinition::new("Adubação", &["Adubação Minijardim"])]);
        let workbook = Workbook {
            sheets: vec![sheet(
                "Adubação",
                vec![Row::new()
                    .with("Data", Cell::Text("2024-05-05".into()))
                    .with("Adubação Minijardim", Cell::Number(91.0))
                    .with("Adubação plataformas", Cell::Number(70.0))],
            )],
        };
        let result = ingest_workbook(&workbook, &config, &options()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].parameter, "Adubação Minijardim");
    }

    #[test]
    fn test_ingest_empty_workbook() {
        let result =
            ingest_workbook(&Workbook::default(), &ProcessConfig::nursery(), &options()).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.metadata, IngestMetadata::default());
    }
}
