//! Assembles the structured report document. Rendering to PDF, HTML or
//! anything else is left to the consumer.

use serde::Serialize;

use crate::config::AnalysisOptions;
use crate::models::{ColumnType, Table};
use crate::services::charts::{self, ChartSpec};
use crate::services::insights::InsightBundle;
use crate::services::statistics::{
    self, CorrelationMatrix, MissingProfile, NumericSummary, OutlierMethod, StatsBundle,
};

pub const REPORT_TITLE: &str = "Data Analysis Report";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub content: SectionContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionContent {
    Paragraphs { items: Vec<String> },
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    Chart { chart: ChartSpec },
}

impl Section {
    fn paragraphs(title: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            title: title.into(),
            content: SectionContent::Paragraphs { items },
        }
    }

    fn chart(title: impl Into<String>, chart: ChartSpec) -> Self {
        Self {
            title: title.into(),
            content: SectionContent::Chart { chart },
        }
    }
}

pub fn assemble(table: &Table, stats: &StatsBundle, insights: &InsightBundle) -> ReportDocument {
    let correlation = statistics::correlate(table);
    let missing = MissingProfile::of_table(table);
    assemble_with(
        table,
        stats,
        insights,
        correlation.as_ref(),
        &missing,
        &AnalysisOptions::default(),
    )
}

/// Section order is fixed: executive summary, descriptive statistics,
/// distributions, correlation heatmap, patterns, recommendations. Sections
/// without data are left out.
pub fn assemble_with(
    table: &Table,
    stats: &StatsBundle,
    insights: &InsightBundle,
    correlation: Option<&CorrelationMatrix>,
    missing: &MissingProfile,
    options: &AnalysisOptions,
) -> ReportDocument {
    let mut sections = vec![Section::paragraphs(
        "Executive Summary",
        executive_summary(table, correlation, missing),
    )];

    if !stats.numeric.is_empty() {
        sections.push(descriptive_table(&stats.numeric, missing));
    }

    for column in table
        .numeric_columns()
        .into_iter()
        .filter(|c| c.missing_count() < c.len())
        .take(options.max_distribution_charts)
    {
        match charts::histogram(column, options.histogram_bins) {
            Ok(chart) => sections.push(Section::chart(format!("Distribution of {}", column.name), chart)),
            Err(err) => tracing::warn!("Skipping distribution chart for '{}': {}", column.name, err),
        }
    }

    if let Some(matrix) = correlation {
        let rounded = matrix.rounded();
        sections.push(Section::chart(
            "Correlation Heatmap",
            ChartSpec::Heatmap {
                x_labels: rounded.columns.clone(),
                y_labels: rounded.columns,
                values: rounded.values,
            },
        ));
    }

    if !insights.findings.is_empty() {
        sections.push(Section::paragraphs("Patterns", insights.findings.clone()));
    }
    if !insights.recommendations.is_empty() {
        sections.push(Section::paragraphs(
            "Recommendations",
            insights.recommendations.clone(),
        ));
    }

    tracing::debug!("Assembled report with {} sections", sections.len());
    ReportDocument {
        title: REPORT_TITLE.to_string(),
        sections,
    }
}

fn executive_summary(
    table: &Table,
    correlation: Option<&CorrelationMatrix>,
    missing: &MissingProfile,
) -> Vec<String> {
    let missing_pct = missing.total_pct();

    let mut items = vec![
        format!(
            "The dataset contains {} records with {} variables.",
            table.row_count(),
            table.column_count()
        ),
        format!("Missing values: {:.2}% of the dataset", missing_pct),
        format!("Numeric columns: {}", table.columns_of(ColumnType::Numeric).count()),
        format!("Categorical columns: {}", table.columns_of(ColumnType::Categorical).count()),
    ];

    let datetime = table.columns_of(ColumnType::Datetime).count();
    if datetime > 0 {
        items.push(format!("Datetime columns: {}", datetime));
    }

    let outliers: usize = statistics::detect_all_outliers(table, OutlierMethod::Iqr)
        .iter()
        .map(|set| set.count)
        .sum();
    items.push(format!("Outliers detected: {} across all numeric variables", outliers));

    items.push(match correlation.and_then(CorrelationMatrix::strongest) {
        Some(pair) => format!(
            "Strongest correlation: {} and {} ({:.2})",
            pair.first, pair.second, pair.coefficient
        ),
        None => "Strongest correlation: N/A".to_string(),
    });

    items
}

/// Two decimals; an undefined statistic renders as `nan`.
fn format_stat(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED_STAT.to_string(), |v| format!("{:.2}", v))
}

pub const UNDEFINED_STAT: &str = "nan";

fn descriptive_table(summaries: &[NumericSummary], missing: &MissingProfile) -> Section {
    let mut header = vec!["Statistic".to_string()];
    header.extend(summaries.iter().map(|s| s.column.clone()));

    let stat_rows: [(&str, fn(&NumericSummary) -> Option<f64>); 10] = [
        ("count", |s| Some(s.count as f64)),
        ("mean", |s| s.mean),
        ("std", |s| s.std),
        ("min", |s| s.min),
        ("25%", |s| s.quartile25),
        ("50%", |s| s.median),
        ("75%", |s| s.quartile75),
        ("max", |s| s.max),
        ("skew", |s| s.skew),
        ("kurtosis", |s| s.kurtosis),
    ];

    let gaps: Vec<(usize, f64)> = summaries
        .iter()
        .map(|s| {
            missing
                .columns
                .iter()
                .find(|m| m.column == s.column)
                .map_or((s.missing_count, s.missing_pct), |m| (m.count, m.pct))
        })
        .collect();

    let mut rows: Vec<Vec<String>> = stat_rows
        .iter()
        .map(|(label, get)| {
            let mut row = vec![label.to_string()];
            row.extend(summaries.iter().map(|s| format_stat(get(s))));
            row
        })
        .collect();

    let mut missing_row = vec!["missing".to_string()];
    missing_row.extend(gaps.iter().map(|(count, _)| format_stat(Some(*count as f64))));
    let mut missing_pct_row = vec!["missing %".to_string()];
    missing_pct_row.extend(gaps.iter().map(|(_, pct)| format_stat(Some(*pct))));
    rows.push(missing_row);
    rows.push(missing_pct_row);

    Section {
        title: "Descriptive Statistics".to_string(),
        content: SectionContent::Table { header, rows },
    }
}
