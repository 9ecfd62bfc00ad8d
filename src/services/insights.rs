use serde::Serialize;
use std::fmt;

use crate::config::AnalysisOptions;
use crate::models::{ColumnType, Table};
use crate::services::statistics::{self, CorrelationMatrix, MissingProfile, OutlierMethod, StatsBundle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    /// `|r| < 0.3` weak, `0.3 <= |r| < 0.7` moderate, `|r| >= 0.7` strong.
    pub fn from_coefficient(r: f64) -> Self {
        let r = r.abs();
        if r < 0.3 {
            CorrelationStrength::Weak
        } else if r < 0.7 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Strong
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStrength::Weak => write!(f, "weak"),
            CorrelationStrength::Moderate => write!(f, "moderate"),
            CorrelationStrength::Strong => write!(f, "strong"),
        }
    }
}

/// Human-readable findings and recommendations for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightBundle {
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

pub const MISSING_VALUES_RECOMMENDATION: &str = "Consider handling missing values using imputation techniques or removing rows/columns with excessive missing data.";

pub fn summarize(table: &Table, stats: &StatsBundle) -> InsightBundle {
    summarize_with(table, stats, &AnalysisOptions::default())
}

/// Missing-data findings describe `table` as given.
pub fn summarize_with(table: &Table, stats: &StatsBundle, options: &AnalysisOptions) -> InsightBundle {
    let correlation = statistics::correlate(table);
    let missing = MissingProfile::of_table(table);
    summarize_with_correlation(table, stats, correlation.as_ref(), &missing, options)
}

/// Same as [`summarize_with`] but reuses an already computed matrix and
/// takes the gaps from `missing`, normally counted before imputation.
pub fn summarize_with_correlation(
    table: &Table,
    stats: &StatsBundle,
    correlation: Option<&CorrelationMatrix>,
    missing: &MissingProfile,
    options: &AnalysisOptions,
) -> InsightBundle {
    let mut insights = InsightBundle::default();

    insights.findings.push(overview(table));

    for gap in missing.columns.iter().filter(|c| c.count > 0) {
        insights.findings.push(format!(
            "Column '{}' has {} missing values ({:.2}%)",
            gap.column, gap.count, gap.pct
        ));
    }
    let any_missing = missing.total() > 0;

    if let Some(matrix) = correlation {
        for pair in matrix.ranked_pairs().into_iter().take(options.top_correlations) {
            insights.findings.push(format!(
                "{} and {}: {:.2} ({} correlation)",
                pair.first,
                pair.second,
                pair.coefficient,
                CorrelationStrength::from_coefficient(pair.coefficient)
            ));
        }
    }

    if any_missing {
        insights
            .recommendations
            .push(MISSING_VALUES_RECOMMENDATION.to_string());
    }

    let outlier_columns: Vec<String> = statistics::detect_all_outliers(table, OutlierMethod::Iqr)
        .into_iter()
        .filter(|set| set.count > 0)
        .map(|set| format!("{} ({} outliers)", set.column, set.count))
        .collect();
    if !outlier_columns.is_empty() {
        insights.recommendations.push(format!(
            "Consider addressing outliers in the following columns: {}",
            outlier_columns.join(", ")
        ));
    }

    let high_cardinality: Vec<String> = stats
        .categorical
        .iter()
        .filter(|s| s.unique_count > options.high_cardinality_threshold)
        .map(|s| format!("{} ({} unique values)", s.column, s.unique_count))
        .collect();
    if !high_cardinality.is_empty() {
        insights.recommendations.push(format!(
            "Consider grouping or encoding high cardinality categorical variables: {}",
            high_cardinality.join(", ")
        ));
    }

    tracing::debug!(
        "Derived {} findings and {} recommendations",
        insights.findings.len(),
        insights.recommendations.len()
    );
    insights
}

fn overview(table: &Table) -> String {
    let numeric = table.columns_of(ColumnType::Numeric).count();
    let categorical = table.columns_of(ColumnType::Categorical).count();
    let datetime = table.columns_of(ColumnType::Datetime).count();

    let breakdown = if datetime > 0 {
        format!("{} numeric, {} categorical, {} datetime", numeric, categorical, datetime)
    } else {
        format!("{} numeric, {} categorical", numeric, categorical)
    };
    format!(
        "The dataset contains {} records with {} variables ({}).",
        table.row_count(),
        table.column_count(),
        breakdown
    )
}
