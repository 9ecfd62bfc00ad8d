//! Tabular analysis engine and the HTTP service around it.
//!
//! Raw CSV or Excel bytes are ingested into a [`models::Table`], cleaned into
//! a typed canonical table, described statistically, summarized into
//! human-readable insights and assembled into a structured report. Each run
//! is independent; nothing is shared between runs.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

pub use error::{AnalysisError, AppError, ErrorKind};
pub use models::{CellValue, Column, ColumnType, Table};
pub use services::pipeline::{analyze, AnalysisRun};

use services::session::SessionStore;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let sessions = SessionStore::new(config.session_capacity, config.session_ttl);
        Self { config, sessions }
    }
}
