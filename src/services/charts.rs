//! Chart data for external renderers. Each [`ChartSpec`] variant carries
//! only the numbers its chart kind needs; no pixels are produced here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::models::{CellValue, Column, Table};
use crate::services::statistics::{self, OutlierMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Histogram,
    Box,
    Heatmap,
}

impl FromStr for ChartKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "scatter" => Ok(ChartKind::Scatter),
            "histogram" => Ok(ChartKind::Histogram),
            "box" => Ok(ChartKind::Box),
            "heatmap" => Ok(ChartKind::Heatmap),
            other => Err(AnalysisError::InvalidArgument(format!(
                "unsupported chart type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartRequest {
    pub kind: String,
    pub x: String,
    #[serde(default)]
    pub y: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Bar {
        x: String,
        y: Option<String>,
        categories: Vec<String>,
        values: Vec<f64>,
    },
    Line {
        x: Option<String>,
        y: String,
        x_values: Vec<CellValue>,
        y_values: Vec<Option<f64>>,
    },
    Scatter {
        x: String,
        y: String,
        points: Vec<[f64; 2]>,
    },
    Histogram {
        column: String,
        bins: Vec<HistogramBin>,
        mean: Option<f64>,
        median: Option<f64>,
    },
    Box {
        column: String,
        summary: BoxSummary,
        outliers: Vec<f64>,
    },
    Heatmap {
        x_labels: Vec<String>,
        y_labels: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    },
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::Bar { .. } => ChartKind::Bar,
            ChartSpec::Line { .. } => ChartKind::Line,
            ChartSpec::Scatter { .. } => ChartKind::Scatter,
            ChartSpec::Histogram { .. } => ChartKind::Histogram,
            ChartSpec::Box { .. } => ChartKind::Box,
            ChartSpec::Heatmap { .. } => ChartKind::Heatmap,
        }
    }
}

fn find_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .ok_or_else(|| AnalysisError::InvalidArgument(format!("unknown column '{}'", name)))
}

fn require_numeric(column: &Column) -> Result<()> {
    if column.is_numeric() {
        Ok(())
    } else {
        Err(AnalysisError::TypeMismatch(format!(
            "column '{}' must be numeric for this chart",
            column.name
        )))
    }
}

fn require_y<'a>(table: &'a Table, y: Option<&str>, kind: ChartKind) -> Result<&'a Column> {
    let y = y.ok_or_else(|| {
        AnalysisError::InvalidArgument(format!("{:?} charts require both X and Y axis variables", kind))
    })?;
    find_column(table, y)
}

pub fn build_chart(table: &Table, request: &ChartRequest, bins: usize) -> Result<ChartSpec> {
    let kind = request.kind.parse::<ChartKind>()?;
    let x = find_column(table, &request.x)?;
    let y = request.y.as_deref().filter(|y| !y.trim().is_empty());

    match kind {
        ChartKind::Bar => match y {
            None => Ok(bar_counts(x)),
            Some(_) => {
                let y = require_y(table, y, kind)?;
                require_numeric(y)?;
                let (categories, values): (Vec<String>, Vec<f64>) = x
                    .values
                    .iter()
                    .zip(&y.values)
                    .filter_map(|(xv, yv)| yv.as_number().map(|n| (xv.to_string(), n)))
                    .unzip();
                Ok(ChartSpec::Bar {
                    x: x.name.clone(),
                    y: Some(y.name.clone()),
                    categories,
                    values,
                })
            }
        },
        ChartKind::Line => match y {
            None => {
                require_numeric(x)?;
                Ok(ChartSpec::Line {
                    x: None,
                    y: x.name.clone(),
                    x_values: (0..x.len()).map(|i| CellValue::Number(i as f64)).collect(),
                    y_values: x.values.iter().map(CellValue::as_number).collect(),
                })
            }
            Some(_) => {
                let y = require_y(table, y, kind)?;
                require_numeric(y)?;
                Ok(ChartSpec::Line {
                    x: Some(x.name.clone()),
                    y: y.name.clone(),
                    x_values: x.values.clone(),
                    y_values: y.values.iter().map(CellValue::as_number).collect(),
                })
            }
        },
        ChartKind::Scatter => {
            let y = require_y(table, y, kind)?;
            require_numeric(x)?;
            require_numeric(y)?;
            let points = x
                .values
                .iter()
                .zip(&y.values)
                .filter_map(|(xv, yv)| Some([xv.as_number()?, yv.as_number()?]))
                .collect();
            Ok(ChartSpec::Scatter {
                x: x.name.clone(),
                y: y.name.clone(),
                points,
            })
        }
        ChartKind::Histogram => histogram(x, bins),
        ChartKind::Box => box_plot(x),
        ChartKind::Heatmap => {
            let y = require_y(table, y, kind)?;
            Ok(cross_tab(x, y))
        }
    }
}

fn bar_counts(column: &Column) -> ChartSpec {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.values.iter().filter(|v| !v.is_missing()) {
        let label = value.to_string();
        let count = counts.entry(label.clone()).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }
    let values = order.iter().map(|label| counts[label] as f64).collect();
    ChartSpec::Bar {
        x: column.name.clone(),
        y: None,
        categories: order,
        values,
    }
}

/// Fixed-width histogram over `[min, max]`. A constant column gets one bin.
pub fn histogram(column: &Column, bins: usize) -> Result<ChartSpec> {
    require_numeric(column)?;
    let values: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
    if values.is_empty() {
        return Err(AnalysisError::InvalidArgument(format!(
            "column '{}' has no values to plot",
            column.name
        )));
    }
    if bins == 0 {
        return Err(AnalysisError::InvalidArgument("histogram needs at least one bin".to_string()));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bin_count = if max > min { bins } else { 1 };
    let width = (max - min) / bin_count as f64;

    let mut counts = vec![0usize; bin_count];
    for v in &values {
        let idx = if width > 0.0 {
            (((v - min) / width).floor() as usize).min(bin_count - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bin_count { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect();

    Ok(ChartSpec::Histogram {
        column: column.name.clone(),
        bins,
        mean: statistics::mean(&values),
        median: statistics::quantile(&values, 0.5),
    })
}

fn box_plot(column: &Column) -> Result<ChartSpec> {
    require_numeric(column)?;
    let mut values: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let (Some(q1), Some(median), Some(q3)) = (
        statistics::quantile(&values, 0.25),
        statistics::quantile(&values, 0.5),
        statistics::quantile(&values, 0.75),
    ) else {
        return Err(AnalysisError::InvalidArgument(format!(
            "column '{}' has no values to plot",
            column.name
        )));
    };

    let outliers = statistics::outliers_in(column, OutlierMethod::Iqr);
    let (lower, upper) = (
        outliers.lower_bound.unwrap_or(f64::NEG_INFINITY),
        outliers.upper_bound.unwrap_or(f64::INFINITY),
    );
    let inside: Vec<f64> = values.iter().copied().filter(|v| *v >= lower && *v <= upper).collect();

    Ok(ChartSpec::Box {
        column: column.name.clone(),
        summary: BoxSummary {
            min: values[0],
            q1,
            median,
            q3,
            max: values[values.len() - 1],
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
        },
        outliers: values.iter().copied().filter(|v| *v < lower || *v > upper).collect(),
    })
}

fn labels_in_order(column: &Column) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    column
        .values
        .iter()
        .filter(|v| !v.is_missing())
        .map(|v| v.to_string())
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Counts of rows for each (x, y) label combination.
fn cross_tab(x: &Column, y: &Column) -> ChartSpec {
    let x_labels = labels_in_order(x);
    let y_labels = labels_in_order(y);
    let x_index: HashMap<&str, usize> = x_labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();
    let y_index: HashMap<&str, usize> = y_labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

    let mut counts = vec![vec![0usize; y_labels.len()]; x_labels.len()];
    for (xv, yv) in x.values.iter().zip(&y.values) {
        if xv.is_missing() || yv.is_missing() {
            continue;
        }
        let (xl, yl) = (xv.to_string(), yv.to_string());
        if let (Some(&i), Some(&j)) = (x_index.get(xl.as_str()), y_index.get(yl.as_str())) {
            counts[i][j] += 1;
        }
    }

    ChartSpec::Heatmap {
        values: counts
            .into_iter()
            .map(|row| row.into_iter().map(|c| Some(c as f64)).collect())
            .collect(),
        x_labels,
        y_labels,
    }
}
