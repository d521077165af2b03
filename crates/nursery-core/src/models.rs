use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DashboardError, Result};
use crate::time_utils::iso_week;

// ── Workbook shape ────────────────────────────────────────────────────────────

/// A single spreadsheet cell value.
///
/// `Empty` covers blank cells and JSON `null`; a row holding an `Empty` cell
/// under a column behaves exactly as if the column were missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// One worksheet row keyed by header (column) name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: HashMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful for fixtures.
    pub fn with(mut self, column: impl Into<String>, cell: Cell) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    /// The cell under `column`, or `None` when the column is missing or blank.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column).filter(|c| !c.is_empty())
    }

    /// `true` when every cell in the row is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(Cell::is_empty)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Cell)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Cell)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A named worksheet: its rows in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// A parsed workbook: sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }
}

// ── EvaluationRecord ──────────────────────────────────────────────────────────

/// Display unit attached to a record; does not affect any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "pts")]
    Points,
}

impl Unit {
    /// `%` when the parameter name itself carries a percent sign.
    pub fn for_parameter(parameter: &str) -> Self {
        if parameter.contains('%') {
            Unit::Percent
        } else {
            Unit::Points
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Points => "pts",
        }
    }
}

/// One (date, process, parameter, value) inspection observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Day the inspection took place.
    pub date: NaiveDate,
    /// Calendar month of `date` (1–12).
    pub month: u32,
    /// ISO-8601 week number of `date` (1–53).
    pub week: u32,
    /// Process identifier (never a reserved one).
    pub process: String,
    /// Parameter name from the process's configured list.
    pub parameter: String,
    /// Score, nominally 0–100; not range-checked.
    pub value: f64,
    pub unit: Unit,
}

impl EvaluationRecord {
    /// Build a record, deriving `month`, `week` and `unit` from the inputs.
    pub fn new(
        date: NaiveDate,
        process: impl Into<String>,
        parameter: impl Into<String>,
        value: f64,
    ) -> Self {
        let parameter = parameter.into();
        Self {
            date,
            month: date.month(),
            week: iso_week(date),
            process: process.into(),
            unit: Unit::for_parameter(&parameter),
            parameter,
            value,
        }
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// A month or week selector: everything, or one specific number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    All,
    Only(u32),
}

impl Selector {
    pub fn matches(&self, value: u32) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(v) => *v == value,
        }
    }

    fn parse_bounded(value: &str, max: u32) -> Result<Self> {
        let selector: Selector = value.parse()?;
        match selector {
            Selector::Only(n) if n == 0 || n > max => {
                Err(DashboardError::InvalidSelector(value.to_string()))
            }
            other => Ok(other),
        }
    }

    /// Parse a month selector (`all` or 1–12).
    pub fn parse_month(value: &str) -> Result<Self> {
        Self::parse_bounded(value, 12)
    }

    /// Parse a week selector (`all` or 1–53).
    pub fn parse_week(value: &str) -> Result<Self> {
        Self::parse_bounded(value, 53)
    }
}

impl FromStr for Selector {
    type Err = DashboardError;

    /// Accepts `all` (plus the Portuguese `todos`/`todas` used in the
    /// spreadsheets) case-insensitively, or a non-negative integer.
    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "all" | "todos" | "todas" => Ok(Selector::All),
            other => other
                .parse::<u32>()
                .map(Selector::Only)
                .map_err(|_| DashboardError::InvalidSelector(value.to_string())),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str("all"),
            Selector::Only(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Selector::All => serializer.serialize_str("all"),
            Selector::Only(n) => serializer.serialize_u32(*n),
        }
    }
}

/// Active month/week filters, applied at read time only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Filters {
    pub month: Selector,
    pub week: Selector,
}

impl Filters {
    pub fn new(month: Selector, week: Selector) -> Self {
        Self { month, week }
    }

    /// `true` when `record` passes both selectors.
    pub fn matches(&self, record: &EvaluationRecord) -> bool {
        self.month.matches(record.month) && self.week.matches(record.week)
    }
}

// ── Ingestion policies ────────────────────────────────────────────────────────

/// What ingestion does with a row whose date cell is present but unreadable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDatePolicy {
    /// Drop the row; it contributes no records.
    #[default]
    Skip,
    /// Date the row with the processing day.
    Today,
}

/// What ingestion does with a parameter cell that is not a number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InvalidValuePolicy {
    /// Emit no record for that cell.
    #[default]
    Drop,
    /// Emit a record with value `0.0`.
    Zero,
    /// Fail the whole ingestion; the previous records stay in place.
    Reject,
}
