use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, Method, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::ColumnType,
    services::{
        charts::{self, ChartRequest, ChartSpec},
        cleaner::CleaningReport,
        export,
        ingest::{self, SourceFormat},
        insights::InsightBundle,
        pipeline::{self, AnalysisRun},
        report::ReportDocument,
        statistics::{self, CorrelationMatrix, MissingProfile, OutlierSet, StatsBundle},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/analysis", post(upload_file))
        .route("/analysis/:id", delete(delete_run))
        .route("/analysis/:id/stats", get(get_stats))
        .route("/analysis/:id/insights", get(get_insights))
        .route("/analysis/:id/report", get(get_report))
        .route("/analysis/:id/outliers", get(get_outliers))
        .route("/analysis/:id/chart", post(build_chart))
        .route("/analysis/:id/export.csv", get(export_csv))
        .route("/analysis/:id/export.xlsx", get(export_xlsx))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: Option<ColumnType>,
    pub missing_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnInfo>,
    pub cleaning: CleaningReport,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: StatsBundle,
    pub correlation: Option<CorrelationMatrix>,
    /// Gaps as uploaded, counted before imputation.
    pub missing: MissingProfile,
}

#[derive(Debug, Deserialize)]
pub struct OutlierParams {
    pub column: String,
    #[serde(default = "default_outlier_method")]
    pub method: String,
}

fn default_outlier_method() -> String {
    "iqr".to_string()
}

fn find_run(state: &AppState, id: Uuid) -> Result<Arc<AnalysisRun>, AppError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let start = std::time::Instant::now();
    tracing::info!(
        "Received upload '{}', size: {}KB",
        params.filename,
        body.len() / 1024
    );

    let limit = state.config.max_file_size;
    if body.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }

    let format = SourceFormat::from_filename(&params.filename)
        .ok_or_else(|| AppError::UnsupportedFormat(params.filename.clone()))?;

    let options = state.config.analysis.clone();
    let run = tokio::task::spawn_blocking(move || {
        let ingest_start = std::time::Instant::now();
        let raw = ingest::read_table(&body, format)?;
        tracing::info!(
            "Parsed {} rows x {} columns in {:?}",
            raw.row_count(),
            raw.column_count(),
            ingest_start.elapsed()
        );
        pipeline::analyze(&raw, &options)
    })
    .await??;

    let response = UploadResponse {
        id: run.id,
        filename: params.filename,
        created_at: run.created_at,
        row_count: run.table.row_count(),
        column_count: run.table.column_count(),
        columns: run
            .table
            .columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                kind: c.kind,
                missing_count: c.missing_count(),
            })
            .collect(),
        cleaning: run.cleaning.clone(),
    };

    state.sessions.insert(run);
    tracing::info!("Upload {} processed in {:?}", response.id, start.elapsed());

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatsResponse>, AppError> {
    let run = find_run(&state, id)?;
    Ok(Json(StatsResponse {
        stats: run.stats.rounded(),
        correlation: run.correlation.as_ref().map(CorrelationMatrix::rounded),
        missing: run.cleaning.missing.rounded(),
    }))
}

pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InsightBundle>, AppError> {
    let run = find_run(&state, id)?;
    Ok(Json(run.insights.clone()))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDocument>, AppError> {
    let run = find_run(&state, id)?;
    Ok(Json(run.report.clone()))
}

pub async fn get_outliers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<OutlierParams>,
) -> Result<Json<OutlierSet>, AppError> {
    let run = find_run(&state, id)?;
    let outliers = statistics::detect_outliers(&run.table, &params.column, &params.method)?;
    tracing::debug!(
        "Found {} {} outliers in '{}'",
        outliers.count,
        params.method,
        params.column
    );
    Ok(Json(outliers))
}

pub async fn build_chart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<ChartSpec>, AppError> {
    let run = find_run(&state, id)?;
    let bins = run.options.histogram_bins;
    let chart = tokio::task::spawn_blocking(move || charts::build_chart(&run.table, &request, bins)).await??;
    Ok(Json(chart))
}

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

type Download = ([(HeaderName, String); 2], Vec<u8>);

fn export_filename(run: &AnalysisRun, extension: &str) -> String {
    format!(
        "data_export_{}.{}",
        run.created_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

fn download(content_type: &str, filename: String, body: Vec<u8>) -> Download {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Download, AppError> {
    let run = find_run(&state, id)?;
    let filename = export_filename(&run, "csv");
    let csv = tokio::task::spawn_blocking(move || export::write_csv(&run.table)).await??;
    Ok(download("text/csv", filename, csv))
}

pub async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Download, AppError> {
    let run = find_run(&state, id)?;
    let filename = export_filename(&run, "xlsx");
    let xlsx = tokio::task::spawn_blocking(move || export::write_xlsx(&run.table)).await??;
    tracing::info!("Exported analysis {} as {}", id, filename);
    Ok(download(XLSX_CONTENT_TYPE, filename, xlsx))
}

pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(id.to_string()))?;
    tracing::info!("Deleted analysis {}", id);
    Ok(StatusCode::NO_CONTENT)
}
