//! Command dispatch against in-memory collaborators.

use super::*;
use crate::export::{ExportMode, execute};
use camino::Utf8PathBuf;
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;
use trailhead_core::TenantFeatures;
use trailhead_core::test_support::area_node;
use trailhead_data::test_support::{
    MemoryArtifactStore, StubEventLog, StubFeatureGraph, StubReferenceSource,
};
use trailhead_data::{ChangeGate, ExportPipeline, PipelineConfig};

fn pipeline(dir: &TempDir, changes: i64, graph: StubFeatureGraph) -> ExportPipeline {
    let work_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
    ExportPipeline::new(
        ChangeGate::new(Arc::new(StubEventLog::with_count(changes))),
        Arc::new(StubReferenceSource::default()),
        Arc::new(graph),
        Arc::new(MemoryArtifactStore::default()),
        PipelineConfig::default().with_work_dir(work_dir),
    )
}

fn one_area(id: i64) -> TenantFeatures {
    TenantFeatures {
        areas: vec![area_node(id)],
        ..TenantFeatures::default()
    }
}

#[rstest]
#[case(0, false, false)]
#[case(2, false, true)]
#[case(0, true, true)]
#[tokio::test]
async fn check_reports_the_gate_decision(
    #[case] changes: i64,
    #[case] force: bool,
    #[case] expected: bool,
) {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = pipeline(&dir, changes, StubFeatureGraph::new());

    let report = execute(&pipeline, ExportMode::Check { force })
        .await
        .expect("check");

    assert_eq!(report, ExportReport::Checked { rebuild: expected });
}

#[rstest]
#[tokio::test]
async fn quiet_batch_is_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = pipeline(&dir, 0, StubFeatureGraph::new().with_tenant(1, one_area(1)));

    let report = execute(&pipeline, ExportMode::Batch { force: false })
        .await
        .expect("batch");

    assert_eq!(report, ExportReport::Skipped);
    assert_eq!(report.failed(), 0);
}

#[rstest]
#[tokio::test]
async fn batch_counts_failures() {
    let dir = TempDir::new().expect("tempdir");
    let graph = StubFeatureGraph::new()
        .with_tenant(1, one_area(1))
        .with_failing_tenant(2);
    let pipeline = pipeline(&dir, 1, graph);

    let report = execute(&pipeline, ExportMode::Batch { force: false })
        .await
        .expect("batch");

    assert_eq!(
        report,
        ExportReport::Batch {
            published: 1,
            failed: 1
        }
    );
    assert_eq!(report.failed(), 1);
}

#[rstest]
#[tokio::test]
async fn single_tenant_ignores_the_gate() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = pipeline(&dir, 0, StubFeatureGraph::new().with_tenant(4, one_area(4)));

    let report = execute(&pipeline, ExportMode::Tenant(4))
        .await
        .expect("tenant export");

    let ExportReport::Tenant { key } = report else {
        panic!("expected a tenant report, found {report:?}");
    };
    assert_eq!(
        key,
        format!("exports/{}/tenant_4_features.db.gz", trailhead_core::SCHEMA_VERSION)
    );
}

#[rstest]
#[tokio::test]
async fn single_tenant_failure_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = pipeline(&dir, 0, StubFeatureGraph::new().with_failing_tenant(9));

    let err = execute(&pipeline, ExportMode::Tenant(9))
        .await
        .expect_err("tenant export fails");

    match err {
        CliError::Tenant { tenant_id, .. } => assert_eq!(tenant_id, 9),
        other => panic!("expected Tenant error, found {other:?}"),
    }
}
