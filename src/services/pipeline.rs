use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::AnalysisOptions;
use crate::error::{AnalysisError, Result};
use crate::models::Table;
use crate::services::cleaner::{self, CleaningReport};
use crate::services::insights::{self, InsightBundle};
use crate::services::report::{self, ReportDocument};
use crate::services::statistics::{self, CorrelationMatrix, StatsBundle};

/// Everything one analysis produces. Immutable once built; callers share it
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub table: Table,
    pub cleaning: CleaningReport,
    pub stats: StatsBundle,
    pub correlation: Option<CorrelationMatrix>,
    pub insights: InsightBundle,
    pub report: ReportDocument,
    pub options: AnalysisOptions,
}

/// Runs clean, describe, correlate, summarize and assemble over a raw table.
pub fn analyze(raw: &Table, options: &AnalysisOptions) -> Result<AnalysisRun> {
    options
        .validate()
        .map_err(|e| AnalysisError::InvalidArgument(e.to_string()))?;
    let start = std::time::Instant::now();

    let (table, cleaning) = cleaner::clean_with_report(raw, options);

    let stats_start = std::time::Instant::now();
    let stats = statistics::describe(&table);
    let correlation = statistics::correlate(&table);
    tracing::info!("Statistics computed in {:?}", stats_start.elapsed());

    // Gaps are reported as uploaded, not as left over after imputation.
    let missing = &cleaning.missing;
    let insights =
        insights::summarize_with_correlation(&table, &stats, correlation.as_ref(), missing, options);
    let report = report::assemble_with(
        &table,
        &stats,
        &insights,
        correlation.as_ref(),
        missing,
        options,
    );

    let run = AnalysisRun {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        table,
        cleaning,
        stats,
        correlation,
        insights,
        report,
        options: options.clone(),
    };
    tracing::info!("Analysis {} completed in {:?}", run.id, start.elapsed());
    Ok(run)
}
