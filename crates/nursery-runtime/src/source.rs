//! Where inspection data comes from: a local workbook, a remote Google
//! Sheets export, or generated demo data.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use nursery_core::error::{DashboardError, Result};
use nursery_core::models::{EvaluationRecord, InvalidDatePolicy, InvalidValuePolicy};
use nursery_core::processes::ProcessConfig;
use nursery_core::settings::DEFAULT_RELAY_URL;
use nursery_core::time_utils::TimezoneHandler;
use nursery_data::demo::generate_demo_records;
use nursery_data::ingest::{ingest_workbook, IngestOptions};
use nursery_data::workbook::{load_workbook, workbook_from_xlsx_bytes};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A workbook source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    File(PathBuf),
    /// Google Sheets document id, fetched as an `.xlsx` export.
    Remote(String),
    Demo,
}

impl fmt::Display for IngestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestSource::File(path) => write!(f, "file {}", path.display()),
            IngestSource::Remote(id) => write!(f, "sheet {}", id),
            IngestSource::Demo => f.write_str("demo data"),
        }
    }
}

/// Direct `.xlsx` export URL of a Google Sheets document.
pub fn export_url(sheet_id: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=xlsx",
        sheet_id
    )
}

/// Export URL of `sheet_id` wrapped in the relay's `url` query parameter.
pub fn relayed_export_url(relay: &str, sheet_id: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(relay, &[("url", export_url(sheet_id))])
        .map_err(|e| DashboardError::Config(format!("invalid relay url {relay:?}: {e}")))
}

/// Run `task` on tokio's blocking pool. A panic or cancellation surfaces as
/// [`DashboardError::Task`].
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| DashboardError::Task(e.to_string()))?
}

// ── SourceLoader ──────────────────────────────────────────────────────────────

/// Turns an [`IngestSource`] into evaluation records.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
    relay_url: String,
    config: ProcessConfig,
    timezone: TimezoneHandler,
    invalid_dates: InvalidDatePolicy,
    invalid_values: InvalidValuePolicy,
}

impl SourceLoader {
    pub fn new(config: ProcessConfig, timezone: TimezoneHandler) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            config,
            timezone,
            invalid_dates: InvalidDatePolicy::default(),
            invalid_values: InvalidValuePolicy::default(),
        }
    }

    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = relay_url.into();
        self
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

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Options for an ingestion run starting now.
    fn ingest_options(&self) -> IngestOptions {
        IngestOptions::new(self.timezone.today())
            .with_policies(self.invalid_dates, self.invalid_values)
    }

    /// Load and normalise `source`.
    ///
    /// Decoding and ingestion are CPU and disk bound, so they run on the
    /// blocking pool instead of the async worker that awaits them.
    pub async fn load(&self, source: &IngestSource) -> Result<Vec<EvaluationRecord>> {
        let config = self.config.clone();
        let options = self.ingest_options();
        match source {
            IngestSource::File(path) => {
                let path = path.clone();
                run_blocking(move || {
                    let workbook = load_workbook(&path)?;
                    Ok(ingest_workbook(&workbook, &config, &options)?.records)
                })
                .await
            }
            IngestSource::Remote(sheet_id) => {
                let bytes = self.fetch_export(sheet_id).await?;
                run_blocking(move || {
                    let workbook = workbook_from_xlsx_bytes(bytes)?;
                    Ok(ingest_workbook(&workbook, &config, &options)?.records)
                })
                .await
            }
            IngestSource::Demo => {
                let mut rng = StdRng::from_entropy();
                let records = generate_demo_records(&config, self.timezone.today(), &mut rng);
                tracing::info!("Generated {} demo records", records.len());
                Ok(records)
            }
        }
    }

    /// Download the `.xlsx` export of `sheet_id` through the relay.
    async fn fetch_export(&self, sheet_id: &str) -> Result<Vec<u8>> {
        let url = relayed_export_url(&self.relay_url, sheet_id)?;
        tracing::debug!(%url, "fetching remote workbook");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Transport(format!(
                "remote sheet {sheet_id} returned HTTP {status}"
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;
        tracing::debug!(bytes = bytes.len(), "remote workbook downloaded");
        Ok(bytes.to_vec())
    }
}
