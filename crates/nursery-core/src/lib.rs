//! Core types and pure computations for the nursery monitor.
//!
//! Holds the record and workbook model, the process table, date and ISO-week
//! utilities, the compliance aggregation math, CLI settings and the small
//! persisted key-value store.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod processes;
pub mod settings;
pub mod time_utils;

pub use error::{DashboardError, Result};
