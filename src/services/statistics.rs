//! Descriptive statistics, correlation and outlier detection over a
//! cleaned table.
//!
//! Every summary keeps full-precision values; call `rounded()` for the
//! two-decimal display form. Undefined quantities (the standard deviation
//! of one value, the skew of two) are `None` rather than NaN.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::models::{Column, ColumnType, Table};

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_opt(value: Option<f64>) -> Option<f64> {
    value.map(round2)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub quartile25: Option<f64>,
    pub median: Option<f64>,
    pub quartile75: Option<f64>,
    pub max: Option<f64>,
    pub skew: Option<f64>,
    pub kurtosis: Option<f64>,
    pub missing_count: usize,
    pub missing_pct: f64,
}

impl NumericSummary {
    pub fn rounded(&self) -> Self {
        Self {
            column: self.column.clone(),
            mean: round_opt(self.mean),
            std: round_opt(self.std),
            min: round_opt(self.min),
            quartile25: round_opt(self.quartile25),
            median: round_opt(self.median),
            quartile75: round_opt(self.quartile75),
            max: round_opt(self.max),
            skew: round_opt(self.skew),
            kurtosis: round_opt(self.kurtosis),
            missing_pct: round2(self.missing_pct),
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub unique_count: usize,
    pub top_value: Option<String>,
    pub top_count: usize,
    pub top_pct: f64,
    pub missing_count: usize,
    pub missing_pct: f64,
    /// The ten most frequent values, most frequent first.
    pub value_counts: Vec<ValueCount>,
}

impl CategoricalSummary {
    pub fn rounded(&self) -> Self {
        Self {
            top_pct: round2(self.top_pct),
            missing_pct: round2(self.missing_pct),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatetimeSummary {
    pub column: String,
    pub count: usize,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub missing_count: usize,
    pub missing_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub count: usize,
    pub pct: f64,
}

/// Per-column gap counts over a fixed number of rows, in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissingProfile {
    pub rows: usize,
    pub columns: Vec<MissingCount>,
}

impl MissingProfile {
    pub fn from_counts<I>(rows: usize, counts: I) -> Self
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        Self {
            rows,
            columns: counts
                .into_iter()
                .map(|(column, count)| MissingCount {
                    column,
                    count,
                    pct: percent(count, rows),
                })
                .collect(),
        }
    }

    /// Gaps as they currently stand in `table`.
    pub fn of_table(table: &Table) -> Self {
        Self::from_counts(
            table.row_count(),
            table.columns().iter().map(|c| (c.name.clone(), c.missing_count())),
        )
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.count).sum()
    }

    /// Share of all cells that are missing.
    pub fn total_pct(&self) -> f64 {
        percent(self.total(), self.rows * self.columns.len())
    }

    pub fn rounded(&self) -> Self {
        Self {
            rows: self.rows,
            columns: self
                .columns
                .iter()
                .map(|c| MissingCount {
                    pct: round2(c.pct),
                    ..c.clone()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsBundle {
    pub row_count: usize,
    pub column_count: usize,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    pub datetime: Vec<DatetimeSummary>,
}

impl StatsBundle {
    pub fn rounded(&self) -> Self {
        Self {
            numeric: self.numeric.iter().map(NumericSummary::rounded).collect(),
            categorical: self.categorical.iter().map(CategoricalSummary::rounded).collect(),
            datetime: self
                .datetime
                .iter()
                .map(|d| DatetimeSummary {
                    missing_pct: round2(d.missing_pct),
                    ..d.clone()
                })
                .collect(),
            ..*self
        }
    }

    pub fn categorical_summary(&self, column: &str) -> Option<&CategoricalSummary> {
        self.categorical.iter().find(|s| s.column == column)
    }
}

enum ColumnStats {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
    Datetime(DatetimeSummary),
}

pub fn describe(table: &Table) -> StatsBundle {
    let start = std::time::Instant::now();
    let rows = table.row_count();

    let per_column: Vec<Option<ColumnStats>> = table
        .columns()
        .par_iter()
        .map(|column| match column.kind {
            Some(ColumnType::Numeric) => Some(ColumnStats::Numeric(summarize_numeric(column, rows))),
            Some(ColumnType::Categorical) => {
                Some(ColumnStats::Categorical(summarize_categorical(column, rows)))
            }
            Some(ColumnType::Datetime) => Some(ColumnStats::Datetime(summarize_datetime(column, rows))),
            None => {
                tracing::warn!("Skipping untyped column '{}' in describe", column.name);
                None
            }
        })
        .collect();

    let mut bundle = StatsBundle {
        row_count: rows,
        column_count: table.column_count(),
        numeric: Vec::new(),
        categorical: Vec::new(),
        datetime: Vec::new(),
    };
    for stats in per_column.into_iter().flatten() {
        match stats {
            ColumnStats::Numeric(s) => bundle.numeric.push(s),
            ColumnStats::Categorical(s) => bundle.categorical.push(s),
            ColumnStats::Datetime(s) => bundle.datetime.push(s),
        }
    }

    tracing::debug!(
        "Described {} numeric, {} categorical, {} datetime columns in {:?}",
        bundle.numeric.len(),
        bundle.categorical.len(),
        bundle.datetime.len(),
        start.elapsed()
    );
    bundle
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolation quantile over already sorted values.
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// True when every value is identical. Deviations from a computed mean can
/// leave a rounding residue, so spread is never judged from them alone.
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    if is_constant(values) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Bias-adjusted Fisher-Pearson skewness (G1). Needs three values.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values)?;
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), v| {
        let d = v - m;
        (m2 + d * d, m3 + d * d * d)
    });
    if m2 == 0.0 || is_constant(values) {
        return Some(0.0);
    }
    let n = n as f64;
    Some(n * (n - 1.0).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}

/// Bias-adjusted excess kurtosis (G2). Needs four values.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    let m = mean(values)?;
    let (m2, m4) = values.iter().fold((0.0, 0.0), |(m2, m4), v| {
        let d2 = (v - m) * (v - m);
        (m2 + d2, m4 + d2 * d2)
    });
    let n = n as f64;
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    if denominator == 0.0 || is_constant(values) {
        return Some(0.0);
    }
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Some(numerator / denominator - adj)
}

fn summarize_numeric(column: &Column, rows: usize) -> NumericSummary {
    let values: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
    let sorted = sorted(&values);
    let missing_count = column.missing_count();

    NumericSummary {
        column: column.name.clone(),
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: sorted.first().copied(),
        quartile25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        quartile75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
        skew: skewness(&values),
        kurtosis: excess_kurtosis(&values),
        missing_count,
        missing_pct: percent(missing_count, rows),
    }
}

/// Value counts ordered by descending count; equal counts keep first-seen order.
pub fn value_counts(column: &Column) -> Vec<ValueCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for text in column.values.iter().filter_map(|v| v.as_text()) {
        let count = counts.entry(text).or_insert(0);
        if *count == 0 {
            order.push(text);
        }
        *count += 1;
    }

    let mut ranked: Vec<ValueCount> = order
        .into_iter()
        .map(|value| ValueCount {
            value: value.to_string(),
            count: counts[value],
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

fn summarize_categorical(column: &Column, rows: usize) -> CategoricalSummary {
    let ranked = value_counts(column);
    let missing_count = column.missing_count();
    let (top_value, top_count) = ranked
        .first()
        .map(|vc| (Some(vc.value.clone()), vc.count))
        .unwrap_or((None, 0));

    CategoricalSummary {
        column: column.name.clone(),
        unique_count: ranked.len(),
        top_value,
        top_count,
        top_pct: percent(top_count, rows),
        missing_count,
        missing_pct: percent(missing_count, rows),
        value_counts: ranked.into_iter().take(10).collect(),
    }
}

fn summarize_datetime(column: &Column, rows: usize) -> DatetimeSummary {
    let stamps: Vec<NaiveDateTime> = column.values.iter().filter_map(|v| v.as_timestamp()).collect();
    let missing_count = column.missing_count();
    DatetimeSummary {
        column: column.name.clone(),
        count: stamps.len(),
        earliest: stamps.iter().min().copied(),
        latest: stamps.iter().max().copied(),
        missing_count,
        missing_pct: percent(missing_count, rows),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

/// Symmetric Pearson correlation matrix over the numeric columns.
/// Entries are `None` where the coefficient is undefined (zero variance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Every defined upper-triangle pair, in column order.
    pub fn pairs(&self) -> Vec<CorrelationPair> {
        let n = self.columns.len();
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(r) = self.values[i][j] {
                    pairs.push(CorrelationPair {
                        first: self.columns[i].clone(),
                        second: self.columns[j].clone(),
                        coefficient: r,
                    });
                }
            }
        }
        pairs
    }

    /// Pairs sorted by descending absolute coefficient. Ties keep column order.
    pub fn ranked_pairs(&self) -> Vec<CorrelationPair> {
        let mut pairs = self.pairs();
        pairs.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        pairs
    }

    pub fn strongest(&self) -> Option<CorrelationPair> {
        self.ranked_pairs().into_iter().next()
    }

    pub fn rounded(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|row| row.iter().map(|v| round_opt(*v)).collect())
                .collect(),
        }
    }
}

fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    if is_constant(&xs) || is_constant(&ys) {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxy, sxx, syy) = pairs.iter().fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
        let dx = x - mx;
        let dy = y - my;
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    });
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

fn as_numbers(column: &Column) -> Vec<Option<f64>> {
    column.values.iter().map(|v| v.as_number()).collect()
}

/// Pearson correlation over all numeric column pairs. `None` when the
/// table has fewer than two numeric columns.
pub fn correlate(table: &Table) -> Option<CorrelationMatrix> {
    let numeric = table.numeric_columns();
    if numeric.len() < 2 {
        tracing::debug!("Skipping correlation: {} numeric columns", numeric.len());
        return None;
    }

    let series: Vec<Vec<Option<f64>>> = numeric.iter().map(|c| as_numbers(c)).collect();
    let n = series.len();
    let mut values = vec![vec![None; n]; n];

    let upper: Vec<((usize, usize), Option<f64>)> = (0..n)
        .flat_map(|i| (i..n).map(move |j| (i, j)))
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i, j)| ((i, j), pearson(&series[i], &series[j])))
        .collect();

    for ((i, j), r) in upper {
        let r = if i == j { r.map(|_| 1.0) } else { r };
        values[i][j] = r;
        values[j][i] = r;
    }

    Some(CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

fn numeric_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    if name.trim().is_empty() {
        return Err(AnalysisError::InvalidArgument("column name is empty".to_string()));
    }
    let column = table
        .column(name)
        .ok_or_else(|| AnalysisError::InvalidArgument(format!("unknown column '{}'", name)))?;
    if !column.is_numeric() {
        return Err(AnalysisError::TypeMismatch(format!(
            "column '{}' is {}, not numeric",
            name,
            column.kind.map(|k| k.to_string()).unwrap_or_else(|| "untyped".to_string())
        )));
    }
    Ok(column)
}

/// Correlation between two named numeric columns.
pub fn correlate_pair(table: &Table, a: &str, b: &str) -> Result<Option<f64>> {
    let x = numeric_column(table, a)?;
    let y = numeric_column(table, b)?;
    Ok(pearson(&as_numbers(x), &as_numbers(y)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

impl FromStr for OutlierMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" => Ok(OutlierMethod::Zscore),
            other => Err(AnalysisError::InvalidArgument(format!(
                "unsupported outlier method '{}': expected 'iqr' or 'zscore'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSet {
    pub column: String,
    pub method: OutlierMethod,
    /// One flag per table row; missing cells are never flagged.
    pub flags: Vec<bool>,
    pub indices: Vec<usize>,
    pub count: usize,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

const IQR_FENCE: f64 = 1.5;
const ZSCORE_LIMIT: f64 = 3.0;

enum Fence {
    Iqr { q1: f64, q3: f64 },
    Zscore { mean: f64, std: f64 },
}

impl Fence {
    fn flags(&self, v: f64) -> bool {
        match *self {
            Fence::Iqr { q1, q3 } => {
                let iqr = q3 - q1;
                v < q1 - IQR_FENCE * iqr || v > q3 + IQR_FENCE * iqr
            }
            Fence::Zscore { mean, std } => ((v - mean) / std).abs() > ZSCORE_LIMIT,
        }
    }

    fn bounds(&self) -> (f64, f64) {
        match *self {
            Fence::Iqr { q1, q3 } => {
                let iqr = q3 - q1;
                (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr)
            }
            Fence::Zscore { mean, std } => (mean - ZSCORE_LIMIT * std, mean + ZSCORE_LIMIT * std),
        }
    }
}

/// Outlier detection by method name (`"iqr"` or `"zscore"`).
pub fn detect_outliers(table: &Table, column: &str, method: &str) -> Result<OutlierSet> {
    let method = method.parse::<OutlierMethod>()?;
    detect_outliers_with(table, column, method)
}

pub fn detect_outliers_with(table: &Table, column: &str, method: OutlierMethod) -> Result<OutlierSet> {
    let column = numeric_column(table, column)?;
    Ok(outliers_in(column, method))
}

/// Outlier sets for every numeric column, in table order.
pub fn detect_all_outliers(table: &Table, method: OutlierMethod) -> Vec<OutlierSet> {
    table
        .numeric_columns()
        .into_iter()
        .map(|column| outliers_in(column, method))
        .collect()
}

pub(crate) fn outliers_in(column: &Column, method: OutlierMethod) -> OutlierSet {
    let valid = column.numeric_values();
    let values: Vec<f64> = valid.iter().map(|(_, v)| *v).collect();

    let fence: Option<Fence> = match method {
        OutlierMethod::Iqr => {
            let sorted = sorted(&values);
            match (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)) {
                (Some(q1), Some(q3)) => Some(Fence::Iqr { q1, q3 }),
                _ => None,
            }
        }
        OutlierMethod::Zscore => match (mean(&values), sample_std(&values)) {
            (Some(mean), Some(std)) if std > 0.0 => Some(Fence::Zscore { mean, std }),
            _ => None,
        },
    };

    let mut flags = vec![false; column.len()];
    let mut indices = Vec::new();
    if let Some(fence) = &fence {
        for (idx, v) in valid {
            if fence.flags(v) {
                flags[idx] = true;
                indices.push(idx);
            }
        }
    }

    let bounds = fence.as_ref().map(Fence::bounds);

    OutlierSet {
        column: column.name.clone(),
        method,
        count: indices.len(),
        flags,
        indices,
        lower_bound: bounds.map(|b| b.0),
        upper_bound: bounds.map(|b| b.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn numeric(name: &str, values: &[f64]) -> Column {
        Column::typed(
            name,
            ColumnType::Numeric,
            values.iter().map(|v| CellValue::Number(*v)).collect(),
        )
    }

    fn categorical(name: &str, values: &[&str]) -> Column {
        Column::typed(
            name,
            ColumnType::Categorical,
            values.iter().map(|v| CellValue::from(*v)).collect(),
        )
    }

    #[test]
    fn test_quantiles_interpolate() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_describe_numeric() {
        let table = Table::new(vec![numeric("x", &[1.0, 2.0, 3.0, 4.0, 100.0])]).unwrap();
        let stats = describe(&table);
        let x = &stats.numeric[0];
        assert_eq!(x.count, 5);
        assert_eq!(x.mean, Some(22.0));
        assert_eq!(x.min, Some(1.0));
        assert_eq!(x.quartile25, Some(2.0));
        assert_eq!(x.median, Some(3.0));
        assert_eq!(x.quartile75, Some(4.0));
        assert_eq!(x.max, Some(100.0));
        assert!((x.std.unwrap() - 43.6177).abs() < 1e-3);
        assert!(x.skew.unwrap() > 2.0);
        assert_eq!(x.missing_count, 0);
        assert_eq!(x.rounded().std, Some(43.62));
    }

    #[test]
    fn test_skew_and_kurtosis_match_adjusted_estimators() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((skewness(&values).unwrap() - 0.818_487).abs() < 1e-5);
        assert!((excess_kurtosis(&values).unwrap() - 0.940_625).abs() < 1e-5);
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(excess_kurtosis(&[1.0, 2.0, 3.0]), None);
        assert_eq!(skewness(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_single_value_has_no_std() {
        let table = Table::new(vec![numeric("x", &[7.0])]).unwrap();
        let stats = describe(&table);
        assert_eq!(stats.numeric[0].std, None);
        assert_eq!(stats.numeric[0].median, Some(7.0));
    }

    #[test]
    fn test_categorical_summary() {
        let table = Table::new(vec![categorical("c", &["b", "a", "a", "b", "c"])]).unwrap();
        let stats = describe(&table);
        let c = &stats.categorical[0];
        assert_eq!(c.unique_count, 3);
        assert_eq!(c.top_value.as_deref(), Some("b"));
        assert_eq!(c.top_count, 2);
        assert_eq!(c.top_pct, 40.0);
        assert_eq!(
            c.value_counts.iter().map(|vc| vc.value.as_str()).collect::<Vec<_>>(),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn test_anti_correlation() {
        let table = Table::new(vec![
            numeric("up", &[1.0, 2.0, 3.0, 4.0]),
            numeric("down", &[8.0, 6.0, 4.0, 2.0]),
        ])
        .unwrap();
        let matrix = correlate(&table).unwrap();
        assert_eq!(round2(matrix.get("up", "down").unwrap()), -1.0);
        assert_eq!(matrix.get("up", "up"), Some(1.0));
        assert_eq!(matrix.get("down", "up"), matrix.get("up", "down"));
    }

    #[test]
    fn test_zero_variance_is_undefined() {
        let table = Table::new(vec![
            numeric("flat", &[3.0, 3.0, 3.0]),
            numeric("x", &[1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let matrix = correlate(&table).unwrap();
        assert_eq!(matrix.get("flat", "x"), None);
        assert_eq!(matrix.get("flat", "flat"), None);
        assert_eq!(matrix.get("x", "x"), Some(1.0));
        assert!(matrix.pairs().is_empty());
    }

    #[test]
    fn test_constant_with_inexact_mean_has_zero_spread() {
        let flat = [0.1, 0.1, 0.1];
        assert_eq!(sample_std(&flat), Some(0.0));
        assert_eq!(skewness(&flat), Some(0.0));

        let table = Table::new(vec![numeric("k", &flat), numeric("x", &[1.0, 2.0, 4.0])]).unwrap();
        let matrix = correlate(&table).unwrap();
        assert_eq!(matrix.get("k", "k"), None);
        assert_eq!(matrix.get("k", "x"), None);
        assert!(matrix.ranked_pairs().is_empty());

        let stats = describe(&table);
        assert_eq!(stats.numeric[0].column, "k");
        assert_eq!(stats.numeric[0].std, Some(0.0));
    }

    #[test]
    fn test_correlation_needs_two_numeric_columns() {
        let table = Table::new(vec![
            numeric("x", &[1.0, 2.0]),
            categorical("c", &["a", "b"]),
        ])
        .unwrap();
        assert!(correlate(&table).is_none());
        assert!(matches!(
            correlate_pair(&table, "x", "c"),
            Err(AnalysisError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_iqr_flags_exactly_the_extreme_value() {
        let table = Table::new(vec![numeric("x", &[1.0, 2.0, 3.0, 4.0, 100.0])]).unwrap();
        let outliers = detect_outliers(&table, "x", "iqr").unwrap();
        assert_eq!(outliers.indices, vec![4]);
        assert_eq!(outliers.flags, vec![false, false, false, false, true]);
        assert_eq!(outliers.lower_bound, Some(-1.0));
        assert_eq!(outliers.upper_bound, Some(7.0));
    }

    #[test]
    fn test_iqr_with_zero_spread_flags_values_off_the_quartiles() {
        let table = Table::new(vec![numeric("x", &[5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 4.0])]).unwrap();
        let outliers = detect_outliers(&table, "x", "iqr").unwrap();
        assert_eq!(outliers.indices, vec![5, 6]);
    }

    #[test]
    fn test_zscore() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let table = Table::new(vec![numeric("x", &values)]).unwrap();
        let outliers = detect_outliers(&table, "x", "zscore").unwrap();
        assert_eq!(outliers.indices, vec![20]);

        let flat = Table::new(vec![numeric("x", &[2.0, 2.0, 2.0])]).unwrap();
        assert_eq!(detect_outliers(&flat, "x", "zscore").unwrap().count, 0);
    }

    #[test]
    fn test_outlier_argument_errors() {
        let table = Table::new(vec![
            numeric("x", &[1.0, 2.0]),
            categorical("c", &["a", "b"]),
        ])
        .unwrap();
        assert!(matches!(
            detect_outliers(&table, "x", "mad"),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert!(matches!(
            detect_outliers(&table, "nope", "iqr"),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert!(matches!(
            detect_outliers(&table, "", "iqr"),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert!(matches!(
            detect_outliers(&table, "c", "iqr"),
            Err(AnalysisError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_no_numeric_columns_gives_empty_results() {
        let table = Table::new(vec![categorical("c", &["a", "b"])]).unwrap();
        let stats = describe(&table);
        assert!(stats.numeric.is_empty());
        assert!(correlate(&table).is_none());
        assert!(detect_all_outliers(&table, OutlierMethod::Iqr).is_empty());
    }
}
