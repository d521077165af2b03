mod bootstrap;
mod report;

use anyhow::{anyhow, bail, Result};
use nursery_core::processes::ProcessConfig;
use nursery_core::settings::Settings;
use nursery_core::time_utils::TimezoneHandler;
use nursery_data::aggregator::DashboardAggregator;
use nursery_data::analysis::{describe_process, summarize};
use nursery_runtime::orchestrator::SyncOrchestrator;
use nursery_runtime::source::{IngestSource, SourceLoader};
use nursery_runtime::state::DashboardState;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used()?;

    bootstrap::ensure_directories(&bootstrap::app_dir())?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Nursery Monitor v{} starting", env!("CARGO_PKG_VERSION"));
    if settings.clear {
        tracing::info!("Remembered spreadsheet id cleared");
    }

    let config = match &settings.processes {
        Some(path) => ProcessConfig::load_from(path)?,
        None => ProcessConfig::nursery(),
    };
    if let Some(name) = &settings.process {
        config.require(name)?;
    }

    let source = select_source(&settings);
    tracing::info!("View: {}, source: {}, timezone: {}", settings.view, source, settings.timezone);

    let loader = SourceLoader::new(config.clone(), TimezoneHandler::new(&settings.timezone))
        .with_relay_url(settings.relay_url.clone())
        .with_policies(settings.invalid_dates, settings.invalid_values);
    let mut orchestrator =
        SyncOrchestrator::new(source.clone(), loader).with_filters(settings.filters());
    if settings.watch {
        orchestrator = orchestrator.with_refresh_secs(u64::from(settings.refresh_rate));
    }
    let (mut rx, handle) = orchestrator.start();

    if settings.watch {
        tokio::select! {
            result = watch(&mut rx, &settings, &config) => {
                handle.abort();
                result?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping sync task");
                handle.abort();
            }
        }
        return Ok(());
    }

    let mut settled = None;
    while let Some(state) = rx.recv().await {
        settled = Some(state);
    }
    let state = settled.ok_or_else(|| anyhow!("sync task ended without a result"))?;
    if let Some(error) = state.last_error() {
        if state.records().is_empty() {
            bail!("could not load {}: {}", source, error);
        }
        tracing::warn!("Showing previous data: {}", error);
    }

    print!("{}", render_view(&state, &settings, &config)?);
    Ok(())
}

/// `--demo` wins, then `--file`, then the (possibly remembered) sheet id.
/// With none of them the dashboard falls back to demo data.
fn select_source(settings: &Settings) -> IngestSource {
    if settings.demo {
        return IngestSource::Demo;
    }
    if let Some(path) = &settings.file {
        return IngestSource::File(path.clone());
    }
    match &settings.sheet_id {
        Some(id) => IngestSource::Remote(id.clone()),
        None => IngestSource::Demo,
    }
}

/// Print the view every time a new record set is committed.
async fn watch(
    rx: &mut mpsc::Receiver<DashboardState>,
    settings: &Settings,
    config: &ProcessConfig,
) -> Result<()> {
    let mut shown_generation = 0;
    while let Some(state) = rx.recv().await {
        if state.is_syncing() {
            continue;
        }
        if let Some(error) = state.last_error() {
            tracing::warn!("Sync failed: {}", error);
        }
        if state.committed_generation() != shown_generation {
            shown_generation = state.committed_generation();
            if let Some(at) = state.last_sync() {
                println!("── synced {} ──", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            print!("{}", render_view(&state, settings, config)?);
        }
    }
    Ok(())
}

fn render_view(state: &DashboardState, settings: &Settings, config: &ProcessConfig) -> Result<String> {
    let records = state.records();
    let filters = state.filters();
    let json = settings.format == "json";

    match settings.view.as_str() {
        "overview" => {
            let summary = summarize(records, filters, config);
            if json {
                report::overview_json(&summary)
            } else {
                Ok(report::overview_text(&summary))
            }
        }
        view @ ("process" | "trend") => {
            let name = settings
                .process
                .as_deref()
                .ok_or_else(|| anyhow!("--view {view} requires --process <NAME>"))?;
            let detail = describe_process(records, filters, config, name)?;
            match (view, json) {
                ("process", true) => report::process_json(&detail),
                ("process", false) => Ok(report::process_text(&detail)),
                (_, true) => report::trend_json(&detail.trend),
                (_, false) => Ok(report::trend_text(&detail.process, &detail.trend)),
            }
        }
        "weeks" => {
            let weeks = DashboardAggregator::new().available_weeks(records);
            if json {
                report::weeks_json(&weeks)
            } else {
                Ok(report::weeks_text(&weeks))
            }
        }
        other => bail!("Unknown view mode: {other}"),
    }
}
