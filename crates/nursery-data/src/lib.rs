//! Data layer for the nursery quality monitor.
//!
//! Loads inspection workbooks (spreadsheet files or JSON documents),
//! normalises them into evaluation records and derives the dashboard views.

pub mod aggregator;
pub mod analysis;
pub mod demo;
pub mod ingest;
pub mod workbook;

pub use nursery_core as core;
