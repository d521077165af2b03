use clap::{CommandFactory, Parser};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DashboardError, Result};
use crate::models::{Filters, InvalidDatePolicy, InvalidValuePolicy, Selector};

/// Default CORS relay used to reach the spreadsheet export endpoint.
pub const DEFAULT_RELAY_URL: &str = "https://api.allorigins.win/raw";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Compliance dashboard for nursery quality inspections
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nursery-monitor",
    about = "Compliance dashboard for nursery quality inspections",
    version
)]
pub struct Settings {
    /// Local workbook to ingest (.xlsx, .xlsm, .xls, .ods or .json)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Remote spreadsheet id, or its full sharing URL (remembered between runs)
    #[arg(long)]
    pub sheet_id: Option<String>,

    /// Ignore every source and show generated demo data
    #[arg(long)]
    pub demo: bool,

    /// Report view
    #[arg(long, default_value = "overview", value_parser = ["overview", "process", "trend", "weeks"])]
    pub view: String,

    /// Process shown by the `process` and `trend` views
    #[arg(long)]
    pub process: Option<String>,

    /// Month filter (`all` or 1-12)
    #[arg(long, default_value = "all", value_parser = Selector::parse_month)]
    pub month: Selector,

    /// Week filter (`all` or ISO week 1-53)
    #[arg(long, default_value = "all", value_parser = Selector::parse_week)]
    pub week: Selector,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// JSON process table replacing the built-in one
    #[arg(long)]
    pub processes: Option<PathBuf>,

    /// Timezone used to date rows without a date (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Handling of unreadable date cells
    #[arg(long, value_enum, default_value_t = InvalidDatePolicy::Skip)]
    pub invalid_dates: InvalidDatePolicy,

    /// Handling of non-numeric parameter cells
    #[arg(long, value_enum, default_value_t = InvalidValuePolicy::Drop)]
    pub invalid_values: InvalidValuePolicy,

    /// Keep running and re-sync the remote spreadsheet periodically
    #[arg(long)]
    pub watch: bool,

    /// Re-sync interval in seconds for --watch (5-3600)
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u32).range(5..=3600))]
    pub refresh_rate: u32,

    /// CORS relay placed in front of the spreadsheet export URL
    #[arg(long, default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Forget the remembered spreadsheet id
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted key-value state saved to `~/.nursery-monitor/last_used.json`.
///
/// Only the remote spreadsheet id survives between runs.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".nursery-monitor").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> std::result::Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Sheet id handling ──────────────────────────────────────────────────────────

/// Accept either a bare spreadsheet id or a sharing URL and return the id.
///
/// ```
/// use nursery_core::settings::extract_sheet_id;
///
/// let url = "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0";
/// assert_eq!(extract_sheet_id(url).unwrap(), "1AbC-d_9");
/// assert_eq!(extract_sheet_id(" 1AbC-d_9 ").unwrap(), "1AbC-d_9");
/// ```
pub fn extract_sheet_id(input: &str) -> Result<String> {
    let trimmed = input.trim();

    let url_re = Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("regex is valid");
    if let Some(caps) = url_re.captures(trimmed) {
        return Ok(caps[1].to_string());
    }

    let id_re = Regex::new(r"^[A-Za-z0-9_-]+$").expect("regex is valid");
    if id_re.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DashboardError::InvalidSheetId(input.to_string()))
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fall back to the remembered spreadsheet id when
    /// none is given, resolve `"auto"` values, and persist the id.
    pub fn load_with_last_used() -> Result<Self> {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Result<Self> {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if let Some(raw) = settings.sheet_id.take() {
            settings.sheet_id = Some(extract_sheet_id(&raw)?);
        }

        if settings.clear {
            LastUsedParams::clear_at(config_path)?;
            return Ok(Self::resolve_auto_values(settings));
        }

        if !is_arg_explicitly_set(&matches, "sheet_id") {
            settings.sheet_id = LastUsedParams::load_from(config_path).sheet_id;
        } else {
            let params = LastUsedParams::from(&settings);
            if let Err(e) = params.save_to(config_path) {
                tracing::warn!(error = %e, "could not persist spreadsheet id");
            }
        }

        Ok(Self::resolve_auto_values(settings))
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Month/week filters selected on the command line.
    pub fn filters(&self) -> Filters {
        Filters::new(self.month, self.week)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            sheet_id: s.sheet_id.clone(),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
