//! Test utility functions for build-reports
#![allow(dead_code)]

use async_trait::async_trait;
use build_reports::core::{ParamValue, PipelineSpec, ReleaseVersion, Task};
use build_reports::store::{InMemoryStore, Pipeline, PipelineRun, PipelineStore, StoreError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Parse version strings, panicking on malformed input
pub fn versions(raw: &[&str]) -> Vec<ReleaseVersion> {
    raw.iter()
        .map(|v| ReleaseVersion::parse(v).expect("test version should parse"))
        .collect()
}

/// String value of a task parameter
pub fn param<'a>(task: &'a Task, name: &str) -> &'a str {
    task.param(name)
        .and_then(ParamValue::as_str)
        .unwrap_or_else(|| panic!("task {} has no string param {}", task.name, name))
}

/// Tasks whose names start with `prefix`
pub fn tasks_with_prefix<'a>(spec: &'a PipelineSpec, prefix: &str) -> Vec<&'a Task> {
    spec.tasks.iter().filter(|t| t.name.starts_with(prefix)).collect()
}

/// Write a channel document into `dir`
pub fn write_channel(dir: &Path, file: &str, name: &str, versions: &[&str]) {
    let quoted: Vec<String> = versions.iter().map(|v| format!("  - \"{}\"", v)).collect();
    let content = format!("name: {}\nversions:\n{}\n", name, quoted.join("\n"));
    std::fs::write(dir.join(file), content).expect("channel should be written");
}

/// Which store call a `FailingStore` breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Get,
    Create,
    Update,
    Run,
}

/// In-memory store that fails one kind of call with an API error
pub struct FailingStore {
    pub inner: InMemoryStore,
    fail_on: FailOn,
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    /// Total store calls made, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: FailOn) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if op == self.fail_on {
            return Err(StoreError::Api {
                status: 500,
                message: format!("injected {:?} failure", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for FailingStore {
    async fn get_pipeline(&self, namespace: &str, name: &str) -> Result<Pipeline, StoreError> {
        self.check(FailOn::Get)?;
        self.inner.get_pipeline(namespace, name).await
    }

    async fn create_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        self.check(FailOn::Create)?;
        self.inner.create_pipeline(namespace, pipeline).await
    }

    async fn update_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        self.check(FailOn::Update)?;
        self.inner.update_pipeline(namespace, pipeline).await
    }

    async fn create_pipeline_run(
        &self,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, StoreError> {
        self.check(FailOn::Run)?;
        self.inner.create_pipeline_run(namespace, run).await
    }
}
