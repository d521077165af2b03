//! Async sync orchestrator.
//!
//! Owns the [`DashboardState`] inside a tokio task. Each ingestion runs in
//! its own task and reports back as a [`DashboardEvent`]; every applied
//! event is followed by a state snapshot on an `mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nursery_core::models::Filters;
use tokio::sync::mpsc;
use tokio::time;

use crate::source::{IngestSource, SourceLoader};
use crate::state::{DashboardEvent, DashboardState};

/// Default seconds between re-syncs in watch mode.
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Requests a caller can send to a running orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    /// Start another ingestion now.
    Refresh,
    SetFilters(Filters),
}

// ── SyncOrchestrator ──────────────────────────────────────────────────────────

/// Background ingestion coordinator.
///
/// Without a refresh interval the loop performs one ingestion, publishes the
/// settled state and exits. With one it keeps re-syncing until the receiver
/// is dropped or the handle aborts it.
pub struct SyncOrchestrator {
    source: IngestSource,
    loader: Arc<SourceLoader>,
    filters: Filters,
    refresh_interval: Option<Duration>,
}

impl SyncOrchestrator {
    pub fn new(source: IngestSource, loader: SourceLoader) -> Self {
        Self {
            source,
            loader: Arc::new(loader),
            filters: Filters::default(),
            refresh_interval: None,
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Re-sync every `secs` seconds (minimum one second).
    pub fn with_refresh_secs(mut self, secs: u64) -> Self {
        self.refresh_interval = Some(Duration::from_secs(secs.max(1)));
        self
    }

    /// Spawn the sync loop.
    pub fn start(self) -> (mpsc::Receiver<DashboardState>, SyncHandle) {
        let (tx, rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.sync_loop(tx, cmd_rx).await;
        });

        (
            rx,
            SyncHandle {
                handle,
                commands: cmd_tx,
            },
        )
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn sync_loop(
        self,
        tx: mpsc::Sender<DashboardState>,
        mut commands: mpsc::Receiver<SyncCommand>,
    ) {
        let mut state = DashboardState::new(self.filters);
        let (done_tx, mut done_rx) = mpsc::channel::<DashboardEvent>(16);

        let watching = self.refresh_interval.is_some();
        let mut interval = time::interval(
            self.refresh_interval
                .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        );
        // The first tick fires immediately; the initial sync below covers it.
        interval.tick().await;

        state = self.begin_ingest(state, &done_tx);
        if !publish(&tx, &state).await {
            return;
        }

        loop {
            tokio::select! {
                Some(event) = done_rx.recv() => {
                    state = state.apply(event);
                    if !publish(&tx, &state).await {
                        break;
                    }
                    if !watching && !state.is_syncing() {
                        tracing::debug!("one-shot sync settled; exiting loop");
                        break;
                    }
                }
                Some(command) = commands.recv() => {
                    state = match command {
                        SyncCommand::Refresh => self.begin_ingest(state, &done_tx),
                        SyncCommand::SetFilters(filters) => {
                            state.apply(DashboardEvent::FiltersChanged(filters))
                        }
                    };
                    if !publish(&tx, &state).await {
                        break;
                    }
                }
                _ = interval.tick(), if watching => {
                    if tx.is_closed() {
                        tracing::debug!("sync channel closed; exiting loop");
                        break;
                    }
                    tracing::debug!(source = %self.source, "scheduled re-sync");
                    state = self.begin_ingest(state, &done_tx);
                    if !publish(&tx, &state).await {
                        break;
                    }
                }
            }
        }
    }

    /// Issue the next generation and run its ingestion in a separate task.
    ///
    /// A second task awaits the first so a panic during loading still
    /// reports back as a failure.
    fn begin_ingest(
        &self,
        state: DashboardState,
        done: &mpsc::Sender<DashboardEvent>,
    ) -> DashboardState {
        let generation = state.next_generation();
        tracing::info!(generation, source = %self.source, "starting ingestion");

        let loader = Arc::clone(&self.loader);
        let source = self.source.clone();
        let task = tokio::spawn(async move { loader.load(&source).await });

        let done = done.clone();
        tokio::spawn(async move {
            let event = match task.await {
                Ok(Ok(records)) => DashboardEvent::IngestCompleted {
                    generation,
                    records,
                    finished_at: Utc::now(),
                },
                Ok(Err(e)) => DashboardEvent::IngestFailed {
                    generation,
                    error: e.to_string(),
                },
                Err(join_err) => DashboardEvent::IngestFailed {
                    generation,
                    error: format!("ingestion task aborted: {join_err}"),
                },
            };
            if done.send(event).await.is_err() {
                tracing::debug!(generation, "sync loop gone; dropping ingestion result");
            }
        });

        state.apply(DashboardEvent::IngestStarted { generation })
    }
}

/// Send a snapshot; `false` once the receiver is gone.
async fn publish(tx: &mpsc::Sender<DashboardState>, state: &DashboardState) -> bool {
    if tx.send(state.clone()).await.is_err() {
        tracing::debug!("snapshot receiver dropped");
        return false;
    }
    true
}

// ── SyncHandle ────────────────────────────────────────────────────────────────

/// Handle to the background sync task.
pub struct SyncHandle {
    handle: tokio::task::JoinHandle<()>,
    commands: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    /// Ask for an immediate re-sync. Returns `false` if the loop has exited.
    pub async fn refresh(&self) -> bool {
        self.commands.send(SyncCommand::Refresh).await.is_ok()
    }

    pub async fn set_filters(&self, filters: Filters) -> bool {
        self.commands
            .send(SyncCommand::SetFilters(filters))
            .await
            .is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Immediately abort the sync loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
