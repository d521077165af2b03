use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::Cell;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Resolves "today" for rows that carry no inspection date.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler with the given IANA timezone name as the default.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// The calendar day that `now` falls on in the configured timezone.
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.default_tz).date_naive()
    }

    /// Today's calendar day in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }

    /// Expose the configured default timezone.
    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }
}

// ── Spreadsheet dates ─────────────────────────────────────────────────────────

/// Day zero of the spreadsheet serial-date system.
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Convert a spreadsheet day serial into a calendar day.
///
/// The fractional (time-of-day) part is discarded. Returns `None` for
/// non-finite serials or ones outside chrono's representable range.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    if days.abs() > 3_000_000.0 {
        return None;
    }
    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(days as i64))
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Numeric dates are read month-first; the day-first forms only match what
/// month-first cannot, e.g. `15/02/2024`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
];

/// Parse a date-like string into a calendar day, ignoring any time part.
///
/// Recognises RFC 3339, ISO date / date-time forms, `YYYY/MM/DD`, and
/// `NN/NN/YYYY` / `NN-NN-YYYY` read as month-first, falling back to
/// day-first when the first number cannot be a month.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// Result of normalising a row's date cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// The cell held a usable serial or date string.
    Parsed(NaiveDate),
    /// The cell was absent; the processing date was used instead.
    Defaulted(NaiveDate),
    /// The cell was present but not understood. Carries the raw text.
    Invalid(String),
}

impl DateOutcome {
    /// The resolved day, if any.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateOutcome::Parsed(d) | DateOutcome::Defaulted(d) => Some(*d),
            DateOutcome::Invalid(_) => None,
        }
    }
}

/// Normalise a raw date cell against the processing date `today`.
pub fn normalize_date(cell: Option<&Cell>, today: NaiveDate) -> DateOutcome {
    match cell {
        None | Some(Cell::Empty) => DateOutcome::Defaulted(today),
        Some(Cell::Number(serial)) => match serial_to_date(*serial) {
            Some(d) => DateOutcome::Parsed(d),
            None => DateOutcome::Invalid(serial.to_string()),
        },
        Some(Cell::Text(s)) if s.trim().is_empty() => DateOutcome::Defaulted(today),
        Some(Cell::Text(s)) => match parse_date_str(s) {
            Some(d) => DateOutcome::Parsed(d),
            None => DateOutcome::Invalid(s.clone()),
        },
        Some(Cell::Bool(b)) => DateOutcome::Invalid(b.to_string()),
    }
}

// ── ISO week ──────────────────────────────────────────────────────────────────

/// ISO-8601 week number of `date`.
///
/// Moves to the Thursday of the Monday-start week, then counts 7-day blocks
/// from January 1 of that Thursday's year.
pub fn iso_week(date: NaiveDate) -> u32 {
    let day_num = i64::from(date.weekday().number_from_monday());
    let thursday = date + Duration::days(4 - day_num);
    // ordinal() is the 1-based day count since January 1 of thursday's year.
    thursday.ordinal().div_ceil(7)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
