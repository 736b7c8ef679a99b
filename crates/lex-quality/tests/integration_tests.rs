//! Integration tests for the data quality pipeline and job lifecycle.
//!
//! These tests verify end-to-end behavior through the public API.

use lex_quality::reporting::read_csv;
use lex_quality::{
    AnalysisConfig, AnalyzerKind, CleaningConfig, DuplicateStrategy, FindingPayload,
    ImputationStrategy, JobId, JobStoreConfig, OutlierStrategy, Pipeline, QualityService,
    Report, Severity,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn analyze(df: &DataFrame) -> Report {
    Pipeline::builder()
        .build()
        .expect("default pipeline")
        .analyze(df)
        .expect("analysis should succeed")
}

fn service() -> QualityService {
    QualityService::with_defaults().expect("default service")
}

fn duplicate_counts(report: &Report) -> (usize, usize) {
    let summary = report
        .findings_for(AnalyzerKind::Duplicates)
        .find_map(|f| match f.payload {
            FindingPayload::DuplicateSummary { duplicate_rows, .. } => Some(duplicate_rows),
            _ => None,
        })
        .expect("duplicate summary");
    let groups = report
        .findings_for(AnalyzerKind::Duplicates)
        .filter(|f| matches!(f.payload, FindingPayload::DuplicateGroup { .. }))
        .count();
    (summary, groups)
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_fixture_end_to_end() {
    let df = read_csv(&fixtures_path().join("customers.csv")).unwrap();
    let report = analyze(&df);

    assert_eq!(report.shape.rows, 21);
    assert_eq!(report.shape.columns, 6);
    assert_eq!(report.columns.len(), 6);
    assert!(report.quality_score.overall <= 100);
    assert!(report.quality_score.completeness < 100.0);

    let kinds: Vec<AnalyzerKind> = report.findings.iter().map(|g| g.analyzer).collect();
    assert_eq!(
        kinds,
        vec![
            AnalyzerKind::TypeInference,
            AnalyzerKind::MissingValues,
            AnalyzerKind::Duplicates,
            AnalyzerKind::Outliers,
            AnalyzerKind::Inconsistencies,
            AnalyzerKind::Correlations,
        ]
    );
    assert_eq!(duplicate_counts(&report), (1, 1));

    let income = report.iqr_result("income").expect("income is analysed");
    assert!(income.count >= 1);
}

#[test]
fn test_analysis_is_deterministic() {
    let df = read_csv(&fixtures_path().join("customers.csv")).unwrap();
    let first = analyze(&df);
    let second = analyze(&df);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_completeness_perfect_without_missing() {
    let df = df!(
        "a" => [1.0, 2.0, 3.0, 4.0],
        "b" => ["w", "x", "y", "z"]
    )
    .unwrap();
    assert_eq!(analyze(&df).quality_score.completeness, 100.0);
}

#[test]
fn test_completeness_with_all_missing_column() {
    let df = df!(
        "a" => [1.0, 2.0, 3.0, 4.0],
        "b" => [None::<f64>, None, None, None]
    )
    .unwrap();
    let report = analyze(&df);
    assert_eq!(report.quality_score.completeness, 50.0);
    assert!(
        report
            .findings_for(AnalyzerKind::MissingValues)
            .any(|f| f.columns == vec!["b".to_string()] && f.severity == Severity::High)
    );
}

#[test]
fn test_iqr_flags_only_extreme_value() {
    let df = df!("value" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
    let report = analyze(&df);
    let iqr = report.iqr_result("value").unwrap();
    assert_eq!(iqr.count, 1);
    assert_eq!(iqr.sample_rows, vec![5]);
}

#[test]
fn test_extreme_magnitudes_do_not_abort_analysis() {
    let mut values: Vec<f64> = (0..20).map(f64::from).collect();
    values.push(1e308);
    values.push(-1e308);
    let df = df!("x" => values).unwrap();

    let report = analyze(&df);
    assert_eq!(report.shape.rows, 22);
    assert_eq!(report.iqr_result("x").unwrap().count, 2);
    assert!(
        report
            .findings_for(AnalyzerKind::Outliers)
            .any(|f| matches!(f.payload, FindingPayload::EnsembleOutliers { rows_scored: 22, .. }))
    );
}

#[test]
fn test_cramers_v_for_dependent_columns() {
    let left: Vec<&str> = (0..40)
        .map(|i| if i % 2 == 0 { "red" } else { "blue" })
        .collect();
    let right: Vec<&str> = (0..40)
        .map(|i| if i % 2 == 0 { "small" } else { "large" })
        .collect();
    let independent: Vec<&str> = (0..40)
        .map(|i| if (i / 2) % 2 == 0 { "north" } else { "south" })
        .collect();
    let df = df!(
        "left" => left,
        "right" => right,
        "other" => independent
    )
    .unwrap();
    let report = analyze(&df);

    let associations: Vec<(Vec<String>, f64)> = report
        .findings_for(AnalyzerKind::Correlations)
        .filter_map(|f| match f.payload {
            FindingPayload::CategoricalAssociation { cramers_v, .. } => {
                Some((f.columns.clone(), cramers_v))
            }
            _ => None,
        })
        .collect();

    assert_eq!(associations.len(), 1);
    let (columns, v) = &associations[0];
    assert_eq!(columns, &vec!["left".to_string(), "right".to_string()]);
    assert!((0.0..=1.0).contains(v));
    assert!(*v > 0.99);
}

#[test]
fn test_drift_against_reference() {
    let reference: Vec<f64> = (0..100).map(f64::from).collect();
    let current: Vec<f64> = (50..150).map(f64::from).collect();
    let reference = df!("value" => reference).unwrap();
    let current = df!("value" => current).unwrap();

    let report = Pipeline::builder()
        .build()
        .unwrap()
        .analyze_with_reference(&current, &reference)
        .unwrap();
    let drift = report.drift.expect("drift section");
    assert_eq!(drift.drifted_columns, vec!["value".to_string()]);
    assert!(drift.unmatched_columns.is_empty());
}

#[test]
fn test_oversized_table_is_rejected() {
    let pipeline = Pipeline::builder()
        .config(AnalysisConfig::builder().max_rows(2).build().unwrap())
        .build()
        .unwrap();
    let service = QualityService::new(pipeline, JobStoreConfig::default()).unwrap();
    let err = service
        .analyze(df!("a" => [1i64, 2, 3]).unwrap())
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");
    assert!(service.list_jobs().is_empty());
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_remove_duplicates_is_idempotent() {
    let df = df!(
        "name" => ["a", "b", "c", "a", "d"],
        "score" => [10i64, 20, 30, 10, 40]
    )
    .unwrap();
    let report = analyze(&df);
    assert_eq!(duplicate_counts(&report), (1, 1));

    let service = service();
    let config = CleaningConfig::builder()
        .duplicates(DuplicateStrategy::Remove)
        .build()
        .unwrap();

    let outcome = service.analyze(df).unwrap();
    let summary = service.clean(&outcome.job_id, &config).unwrap();
    assert_eq!(summary.rows_after, 4);
    assert_eq!(summary.duplicate_rows_removed, 1);
    let cleaned = service.get_cleaned_table(&outcome.job_id).unwrap();

    let again = service.analyze(cleaned.clone()).unwrap();
    assert_eq!(duplicate_counts(&again.report), (0, 0));
    service.clean(&again.job_id, &config).unwrap();
    let cleaned_again = service.get_cleaned_table(&again.job_id).unwrap();
    assert!(cleaned.equals_missing(&cleaned_again));
}

#[test]
fn test_mean_imputation_uses_deduplicated_statistics() {
    let df = df!(
        "a" => [Some(1.0), Some(1.0), Some(1.0), Some(4.0), None],
        "b" => ["x", "x", "x", "y", "z"]
    )
    .unwrap();
    let service = service();
    let outcome = service.analyze(df).unwrap();

    let config = CleaningConfig::builder()
        .duplicates(DuplicateStrategy::Remove)
        .imputation(ImputationStrategy::Mean)
        .build()
        .unwrap();
    let summary = service.clean(&outcome.job_id, &config).unwrap();

    assert_eq!(summary.duplicate_rows_removed, 2);
    assert_eq!(summary.imputations.len(), 1);
    assert_eq!(summary.imputations[0].column, "a");
    assert_eq!(summary.imputations[0].fill_value, "2.5");

    let cleaned = service.get_cleaned_table(&outcome.job_id).unwrap();
    let a = cleaned.column("a").unwrap().f64().unwrap();
    assert_eq!(a.get(2), Some(2.5));
    assert_eq!(a.null_count(), 0);
}

#[test]
fn test_outlier_strategies_use_report_bounds() {
    let df = df!("value" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
    let service = service();
    let outcome = service.analyze(df).unwrap();
    let upper = outcome.report.iqr_result("value").unwrap().upper_bound;

    let clip = CleaningConfig::builder()
        .duplicates(DuplicateStrategy::Keep)
        .outliers(OutlierStrategy::Clip)
        .build()
        .unwrap();
    let summary = service.clean(&outcome.job_id, &clip).unwrap();
    assert_eq!(summary.values_clipped, 1);
    let cleaned = service.get_cleaned_table(&outcome.job_id).unwrap();
    assert_eq!(cleaned.column("value").unwrap().f64().unwrap().get(5), Some(upper));

    let remove = CleaningConfig::builder()
        .duplicates(DuplicateStrategy::Keep)
        .outliers(OutlierStrategy::Remove)
        .build()
        .unwrap();
    let summary = service.clean(&outcome.job_id, &remove).unwrap();
    assert_eq!(summary.rows_after, 5);
    assert_eq!(summary.outlier_rows_removed, 1);
}

#[test]
fn test_auto_duplicates_resolves_from_severity() {
    let df = read_csv(&fixtures_path().join("customers.csv")).unwrap();
    let service = service();
    let outcome = service.analyze(df).unwrap();
    let summary = service
        .clean(&outcome.job_id, &CleaningConfig::default())
        .unwrap();
    // One duplicate in 21 rows stays below the high threshold, so auto flags
    assert_eq!(outcome.report.duplicate_severity(), Severity::Medium);
    assert_eq!(summary.duplicate_strategy_applied, DuplicateStrategy::Flag);
    assert_eq!(summary.rows_flagged_duplicate, 1);
    assert_eq!(summary.rows_after, 21);
}

// ============================================================================
// Job Lifecycle
// ============================================================================

#[test]
fn test_job_lifecycle_errors() {
    let service = service();
    let unknown = JobId::from("no-such-job");

    let err = service
        .clean(&unknown, &CleaningConfig::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "JOB_NOT_FOUND");
    assert!(service.get_cleaned_table(&unknown).unwrap_err().is_not_found());
    assert!(service.get_report(&unknown).unwrap_err().is_not_found());

    let outcome = service.analyze(df!("a" => [1.0, 2.0, 3.0]).unwrap()).unwrap();
    let err = service.get_cleaned_table(&outcome.job_id).unwrap_err();
    assert_eq!(err.error_code(), "NO_CLEANED_TABLE");

    let config = CleaningConfig::builder()
        .column_imputation("missing", ImputationStrategy::Mean)
        .build()
        .unwrap();
    let err = service.clean(&outcome.job_id, &config).unwrap_err();
    assert!(err.is_input_error());

    service.delete(&outcome.job_id);
    service.delete(&outcome.job_id);
    assert!(service.get_report(&outcome.job_id).unwrap_err().is_not_found());
}

#[test]
fn test_list_jobs_in_creation_order() {
    let service = service();
    let first = service.analyze(df!("a" => [1.0, 2.0]).unwrap()).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let second = service.analyze(df!("a" => [3.0, 4.0]).unwrap()).unwrap();

    let ids: Vec<JobId> = service.list_jobs().into_iter().map(|j| j.job_id).collect();
    assert_eq!(ids, vec![first.job_id, second.job_id]);
}

#[test]
fn test_concurrent_requests_share_one_service() {
    let service = service();
    let tables: Vec<DataFrame> = (0..8)
        .map(|i| {
            let values: Vec<f64> = (0..30).map(|v| f64::from(v * (i + 1))).collect();
            df!("value" => values, "label" => vec!["a"; 30]).unwrap()
        })
        .collect();

    let mut ids: Vec<JobId> = std::thread::scope(|scope| {
        let handles: Vec<_> = tables
            .into_iter()
            .map(|table| {
                let service = &service;
                scope.spawn(move || service.analyze(table).unwrap().job_id)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut listed: Vec<JobId> = service.list_jobs().into_iter().map(|j| j.job_id).collect();
    ids.sort();
    listed.sort();
    assert_eq!(listed, ids);

    // Concurrent cleans of one job all succeed against the same source table
    let target = ids[0].clone();
    let config = CleaningConfig::builder()
        .duplicates(DuplicateStrategy::Keep)
        .build()
        .unwrap();
    let summaries: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| service.clean(&target, &config).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(summaries.iter().all(|s| *s == summaries[0]));
    assert_eq!(service.get_cleaned_table(&target).unwrap().height(), 30);

    // Deleting while cleaning leaves the job gone for good
    let doomed = ids[1].clone();
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..10 {
                if let Err(err) = service.clean(&doomed, &config) {
                    assert!(err.is_not_found());
                }
            }
        });
        scope.spawn(|| service.delete(&doomed));
    });
    assert!(service.get_report(&doomed).unwrap_err().is_not_found());
    assert!(service.get_cleaned_table(&doomed).unwrap_err().is_not_found());
    assert_eq!(service.list_jobs().len(), ids.len() - 1);
    assert!(service.list_jobs().iter().all(|j| j.job_id != doomed));
}

#[test]
fn test_ttl_eviction() {
    let service = QualityService::new(
        Pipeline::builder().build().unwrap(),
        JobStoreConfig {
            ttl_secs: 60,
            reap_interval_secs: 60,
        },
    )
    .unwrap();
    let outcome = service.analyze(df!("a" => [1.0, 2.0]).unwrap()).unwrap();

    let now = chrono::Utc::now().timestamp_millis();
    assert_eq!(service.store().reap_expired_at(now), 0);
    assert_eq!(service.store().reap_expired_at(now + 61_000), 1);
    assert!(service.get_report(&outcome.job_id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_background_reaper_evicts_jobs() {
    let service = QualityService::new(
        Pipeline::builder().build().unwrap(),
        JobStoreConfig {
            ttl_secs: 0,
            reap_interval_secs: 1,
        },
    )
    .unwrap();
    service.analyze(df!("a" => [1.0, 2.0]).unwrap()).unwrap();
    assert_eq!(service.list_jobs().len(), 1);

    let handle = service.spawn_reaper();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(service.list_jobs().is_empty());
    handle.abort();
}
