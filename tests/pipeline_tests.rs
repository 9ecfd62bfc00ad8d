use sheet_insights::config::AnalysisOptions;
use sheet_insights::services::cleaner;
use sheet_insights::services::ingest::{read_table, SourceFormat};
use sheet_insights::services::insights::MISSING_VALUES_RECOMMENDATION;
use sheet_insights::services::report::SectionContent;
use sheet_insights::services::statistics;
use sheet_insights::{analyze, AnalysisError, CellValue, ColumnType, Table};

fn csv_table(data: &str) -> Table {
    read_table(data.as_bytes(), SourceFormat::Csv).unwrap()
}

#[test]
fn test_duplicate_rows_collapse() {
    let raw = csv_table("A,B\n1,x\n1,x\n5,y\n");
    let run = analyze(&raw, &AnalysisOptions::default()).unwrap();
    assert_eq!(run.table.row_count(), 2);
    assert_eq!(run.cleaning.rows_in, 3);
    assert_eq!(run.cleaning.duplicates_removed, 1);
}

#[test]
fn test_high_cardinality_recommendation() {
    let mut data = String::from("id,city\n");
    for i in 0..30 {
        data.push_str(&format!("{},City_{}\n", i + 1, i % 25));
    }
    let run = analyze(&csv_table(&data), &AnalysisOptions::default()).unwrap();

    assert_eq!(run.table.row_count(), 30);
    let city = run.stats.categorical_summary("city").unwrap();
    assert_eq!(city.unique_count, 25);
    assert!(run
        .insights
        .recommendations
        .contains(&"Consider grouping or encoding high cardinality categorical variables: city (25 unique values)".to_string()));
}

#[test]
fn test_perfect_anticorrelation() {
    let run = analyze(
        &csv_table("x,y\n1,10\n2,8\n3,6\n4,4\n5,2\n"),
        &AnalysisOptions::default(),
    )
    .unwrap();
    let matrix = run.correlation.as_ref().unwrap().rounded();
    assert_eq!(matrix.get("x", "y"), Some(-1.0));
    assert!(run
        .insights
        .findings
        .contains(&"x and y: -1.00 (strong correlation)".to_string()));
}

#[test]
fn test_complete_dataset_has_no_missing_insights() {
    let run = analyze(
        &csv_table("a,b\n1,red\n2,blue\n3,red\n4,green\n"),
        &AnalysisOptions::default(),
    )
    .unwrap();
    assert!(run.insights.findings.iter().all(|f| !f.contains("missing values")));
    assert!(!run
        .insights
        .recommendations
        .contains(&MISSING_VALUES_RECOMMENDATION.to_string()));
}

#[test]
fn test_cleaning_is_idempotent() {
    let raw = csv_table(
        "amount,label,when\n\
         10,Alpha,2024-01-01\n\
         ,alpha ,2024-01-02\n\
         12,beta,\n\
         oops,,2024-01-04\n\
         10,Alpha,2024-01-01\n\
         15,gamma,2024-01-06\n",
    );
    let options = AnalysisOptions::default();
    let once = cleaner::clean(&raw, &options);
    let twice = cleaner::clean(&once, &options);
    assert_eq!(once, twice);

    for column in once.columns() {
        if column.kind != Some(ColumnType::Datetime) {
            assert_eq!(column.missing_count(), 0, "column {}", column.name);
        }
    }
    assert!(once.row_count() <= raw.row_count());
}

#[test]
fn test_mixed_report_structure() {
    let raw = csv_table(
        "price,qty,region\n\
         10,1,north\n\
         12,2,south\n\
         11,,north\n\
         13,4,east\n\
         400,5,south\n",
    );
    let run = analyze(&raw, &AnalysisOptions::default()).unwrap();

    assert_eq!(
        run.report.section_titles(),
        vec![
            "Executive Summary",
            "Descriptive Statistics",
            "Distribution of price",
            "Distribution of qty",
            "Correlation Heatmap",
            "Patterns",
            "Recommendations",
        ]
    );

    let SectionContent::Paragraphs { items } = &run.report.sections[0].content else {
        panic!("executive summary must be paragraphs");
    };
    assert_eq!(items[0], "The dataset contains 5 records with 3 variables.");
    assert_eq!(items[2], "Numeric columns: 2");
    assert_eq!(items[3], "Categorical columns: 1");
    assert_eq!(items[4], "Outliers detected: 1 across all numeric variables");

    let outliers = statistics::detect_outliers(&run.table, "price", "iqr").unwrap();
    assert_eq!(outliers.indices, vec![4]);
    assert!(matches!(
        statistics::detect_outliers(&run.table, "region", "iqr"),
        Err(AnalysisError::TypeMismatch(_))
    ));
}

#[test]
fn test_categorical_values_are_normalized() {
    let run = analyze(
        &csv_table("id,team\n1, Red\n2,RED\n3,nan\n4,blue\n"),
        &AnalysisOptions::default(),
    )
    .unwrap();
    let team = run.table.column("team").unwrap();
    assert_eq!(
        team.values,
        vec![
            CellValue::from("red"),
            CellValue::from("red"),
            CellValue::from("red"),
            CellValue::from("blue"),
        ]
    );
    assert_eq!(run.cleaning.columns[1].imputed, 1);
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(matches!(
        read_table(b"a,b\n", SourceFormat::Csv),
        Err(AnalysisError::EmptyInput(_))
    ));
}
