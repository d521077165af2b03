//! Runtime layer for the nursery quality monitor.
//!
//! Holds the dashboard state reducer, the ingestion sources and the async
//! orchestrator that keeps the record set in sync.

pub mod orchestrator;
pub mod source;
pub mod state;

pub use nursery_core as core;
pub use nursery_data as data;
