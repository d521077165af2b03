//! Dashboard application state and its update function.
//!
//! All mutation goes through [`DashboardState::apply`]. Ingestion requests
//! carry a generation number; only the most recently issued generation may
//! replace the record set, so an older, slower fetch can never overwrite a
//! newer one.

use chrono::{DateTime, Utc};

use nursery_core::models::{EvaluationRecord, Filters};

/// Events accepted by [`DashboardState::apply`].
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// An ingestion with this generation was issued.
    IngestStarted { generation: u64 },
    /// An ingestion finished with `records`.
    IngestCompleted {
        generation: u64,
        records: Vec<EvaluationRecord>,
        finished_at: DateTime<Utc>,
    },
    /// An ingestion failed, or its task died.
    IngestFailed { generation: u64, error: String },
    FiltersChanged(Filters),
}

/// Snapshot of everything the dashboard shows.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    records: Vec<EvaluationRecord>,
    filters: Filters,
    /// Ingestions issued but not yet completed or failed.
    outstanding: usize,
    latest_generation: u64,
    committed_generation: u64,
    last_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl DashboardState {
    pub fn new(filters: Filters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// `true` while any ingestion is outstanding.
    pub fn is_syncing(&self) -> bool {
        self.outstanding > 0
    }

    /// Generation number to hand to the next ingestion.
    pub fn next_generation(&self) -> u64 {
        self.latest_generation + 1
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    /// Generation whose records are currently held, `0` before any commit.
    pub fn committed_generation(&self) -> u64 {
        self.committed_generation
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Error of the latest failed ingestion, cleared by the next commit.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Update ────────────────────────────────────────────────────────────

    /// Apply one event and return the resulting state.
    pub fn apply(mut self, event: DashboardEvent) -> Self {
        match event {
            DashboardEvent::IngestStarted { generation } => {
                self.outstanding += 1;
                self.latest_generation = self.latest_generation.max(generation);
            }
            DashboardEvent::IngestCompleted {
                generation,
                records,
                finished_at,
            } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                if generation != self.latest_generation {
                    tracing::debug!(
                        generation,
                        latest = self.latest_generation,
                        "discarding superseded ingestion result"
                    );
                } else if records.is_empty() {
                    tracing::warn!(generation, "ingestion produced no records; keeping current data");
                } else {
                    tracing::info!(generation, records = records.len(), "committing ingestion result");
                    self.records = records;
                    self.committed_generation = generation;
                    self.last_sync = Some(finished_at);
                    self.last_error = None;
                }
            }
            DashboardEvent::IngestFailed { generation, error } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                tracing::warn!(generation, error = %error, "ingestion failed; keeping current data");
                if generation == self.latest_generation {
                    self.last_error = Some(error);
                }
            }
            DashboardEvent::FiltersChanged(filters) => {
                self.filters = filters;
            }
        }
        self
    }
}
