//! Pipeline store - where pipeline definitions live and runs are created

pub mod kubeconfig;
pub mod resource;
pub mod tekton;

pub use resource::{ObjectMeta, Pipeline, PipelineRun};
pub use tekton::{ClusterConfig, TektonClient};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error means the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Operations the syncer needs from the orchestrator
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Fetch a pipeline, failing with `StoreError::NotFound` when absent
    async fn get_pipeline(&self, namespace: &str, name: &str) -> Result<Pipeline, StoreError>;

    async fn create_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError>;

    /// Replace a pipeline; the metadata's resource version guards concurrent writes
    async fn update_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError>;

    /// Create a run, returning it with its server-assigned name
    async fn create_pipeline_run(
        &self,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, StoreError>;
}

#[async_trait]
impl<T: PipelineStore + ?Sized> PipelineStore for std::sync::Arc<T> {
    async fn get_pipeline(&self, namespace: &str, name: &str) -> Result<Pipeline, StoreError> {
        (**self).get_pipeline(namespace, name).await
    }

    async fn create_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        (**self).create_pipeline(namespace, pipeline).await
    }

    async fn update_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        (**self).update_pipeline(namespace, pipeline).await
    }

    async fn create_pipeline_run(
        &self,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, StoreError> {
        (**self).create_pipeline_run(namespace, run).await
    }
}

/// In-memory store (for testing or offline use)
///
/// Mimics the API server closely enough for the syncer: resource versions are
/// bumped on every write, stale updates conflict, and run names are generated.
pub struct InMemoryStore {
    pipelines: tokio::sync::RwLock<HashMap<(String, String), Pipeline>>,
    runs: tokio::sync::RwLock<Vec<PipelineRun>>,
    revision: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            pipelines: tokio::sync::RwLock::new(HashMap::new()),
            runs: tokio::sync::RwLock::new(Vec::new()),
            revision: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Current copy of a stored pipeline
    pub async fn pipeline(&self, namespace: &str, name: &str) -> Option<Pipeline> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// All runs created so far, oldest first
    pub async fn runs(&self) -> Vec<PipelineRun> {
        self.runs.read().await.clone()
    }

    /// Number of successful create calls
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of successful update calls
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn pipeline_key(namespace: &str, pipeline: &Pipeline) -> Result<(String, String), StoreError> {
    let name = pipeline
        .name()
        .ok_or_else(|| StoreError::Api {
            status: 422,
            message: "metadata.name is required".to_string(),
        })?;
    Ok((namespace.to_string(), name.to_string()))
}

#[async_trait]
impl PipelineStore for InMemoryStore {
    async fn get_pipeline(&self, namespace: &str, name: &str) -> Result<Pipeline, StoreError> {
        self.pipeline(namespace, name)
            .await
            .ok_or_else(|| StoreError::NotFound {
                kind: "Pipeline",
                name: name.to_string(),
            })
    }

    async fn create_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        let key = pipeline_key(namespace, pipeline)?;
        let mut pipelines = self.pipelines.write().await;

        if pipelines.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "pipelines \"{}\" already exists",
                key.1
            )));
        }

        let mut stored = pipeline.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.resource_version = Some(self.next_revision());
        stored.metadata.extra.insert(
            "uid".to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        stored.metadata.extra.insert(
            "creationTimestamp".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        pipelines.insert(key, stored.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        let key = pipeline_key(namespace, pipeline)?;
        let mut pipelines = self.pipelines.write().await;

        let current = pipelines.get(&key).ok_or_else(|| StoreError::NotFound {
            kind: "Pipeline",
            name: key.1.clone(),
        })?;

        if pipeline.metadata.resource_version.is_some()
            && pipeline.metadata.resource_version != current.metadata.resource_version
        {
            return Err(StoreError::Conflict(format!(
                "the object has been modified; pipelines \"{}\"",
                key.1
            )));
        }

        let mut stored = pipeline.clone();
        stored.metadata.resource_version = Some(self.next_revision());

        pipelines.insert(key, stored.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn create_pipeline_run(
        &self,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, StoreError> {
        let name = match (&run.metadata.name, &run.metadata.generate_name) {
            (Some(name), _) => name.clone(),
            (None, Some(prefix)) => {
                let suffix: String = Uuid::new_v4().simple().to_string().chars().take(5).collect();
                format!("{}{}", prefix, suffix)
            }
            (None, None) => {
                return Err(StoreError::Api {
                    status: 422,
                    message: "metadata.name or metadata.generateName is required".to_string(),
                })
            }
        };

        let mut created = run.clone();
        created.metadata.name = Some(name);
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.resource_version = Some(self.next_revision());

        self.runs.write().await.push(created.clone());
        Ok(created)
    }
}
