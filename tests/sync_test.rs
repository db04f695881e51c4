//! Pipeline synchronisation against store doubles

mod helpers;

use build_reports::core::PipelineAssembler;
use build_reports::store::InMemoryStore;
use build_reports::sync::{PipelineSyncer, SyncAction, SyncConfig, SyncError};
use helpers::*;
use std::sync::Arc;
use std::time::Duration;

fn config() -> SyncConfig {
    SyncConfig::new("build-reports", "ci")
}

#[tokio::test]
async fn test_second_sync_of_unchanged_spec_updates() {
    let spec = PipelineAssembler::default()
        .assemble(&versions(&["4.6.0", "4.6.1", "4.7.0"]))
        .unwrap();
    let syncer = PipelineSyncer::new(InMemoryStore::new(), config());

    let first = syncer.sync(spec.clone()).await.unwrap();
    let second = syncer.sync(spec.clone()).await.unwrap();

    assert_eq!(first.action, SyncAction::Created);
    assert_eq!(second.action, SyncAction::Updated);
    assert_eq!(syncer.store().create_count(), 1);
    assert_eq!(syncer.store().update_count(), 1);

    let stored = syncer.store().pipeline("ci", "build-reports").await.unwrap();
    assert_eq!(stored.spec, spec);
    assert_eq!(syncer.store().runs().await.len(), 2);
}

#[tokio::test]
async fn test_store_shared_between_syncers() {
    let store = Arc::new(InMemoryStore::new());
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    let first = PipelineSyncer::new(store.clone(), config());
    first.sync(spec.clone()).await.unwrap();

    // A fresh process sees the object written by the previous one
    let second = PipelineSyncer::new(store.clone(), config());
    let outcome = second.sync(spec).await.unwrap();
    assert_eq!(outcome.action, SyncAction::Updated);
    assert_eq!(store.create_count(), 1);
}

#[tokio::test]
async fn test_lookup_failure_is_fatal() {
    let syncer = PipelineSyncer::new(FailingStore::new(FailOn::Get), config());
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    let err = syncer.sync(spec).await.unwrap_err();
    assert!(matches!(err, SyncError::Lookup { .. }));
    // Neither create nor run was attempted
    assert_eq!(syncer.store().calls(), 1);
    assert!(syncer.store().inner.runs().await.is_empty());
}

#[tokio::test]
async fn test_create_failure_triggers_nothing() {
    let syncer = PipelineSyncer::new(FailingStore::new(FailOn::Create), config());
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    let err = syncer.sync(spec).await.unwrap_err();
    assert!(matches!(err, SyncError::Create { .. }));
    assert!(syncer.store().inner.runs().await.is_empty());
}

#[tokio::test]
async fn test_update_failure_is_fatal() {
    let syncer = PipelineSyncer::new(FailingStore::new(FailOn::Update), config());
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    syncer.sync(spec.clone()).await.unwrap();
    let err = syncer.sync(spec).await.unwrap_err();
    assert!(matches!(err, SyncError::Update { .. }));
    assert_eq!(syncer.store().inner.runs().await.len(), 1);
}

#[tokio::test]
async fn test_run_failure_keeps_written_pipeline() {
    let syncer = PipelineSyncer::new(FailingStore::new(FailOn::Run), config());
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    let err = syncer.sync(spec).await.unwrap_err();
    assert!(matches!(err, SyncError::Run { .. }));
    assert!(err.to_string().contains("build-reports"));

    // No rollback of the definition
    assert!(syncer.store().inner.pipeline("ci", "build-reports").await.is_some());
}

#[tokio::test]
async fn test_run_references_pipeline_with_timeout() {
    let syncer = PipelineSyncer::new(
        InMemoryStore::new(),
        config().with_run_timeout(Duration::from_secs(5400)),
    );
    let spec = PipelineAssembler::default().assemble(&versions(&["4.6.0"])).unwrap();

    let outcome = syncer.sync(spec).await.unwrap();
    let runs = syncer.store().runs().await;

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name(), Some(outcome.run_name.as_str()));
    assert_eq!(runs[0].spec.pipeline_ref.name, "build-reports");
    assert_eq!(runs[0].spec.timeout.as_deref(), Some("1h30m0s"));
    assert_eq!(
        runs[0].metadata.generate_name.as_deref(),
        Some("build-reports-")
    );
}
