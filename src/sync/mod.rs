//! Pipeline synchronisation - create-or-update the definition, then trigger a run

use crate::core::{
    config::{ReportConfig, DEFAULT_RUN_TIMEOUT_SECS},
    PipelineSpec,
};
use crate::store::{Pipeline, PipelineRun, PipelineStore, StoreError};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Error types for synchronisation; every one of them ends the run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to look up pipeline {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create pipeline {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update pipeline {name}: {source}")]
    Update {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create run of pipeline {name}: {source}")]
    Run {
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Where the pipeline lives and how its runs are bounded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub pipeline_name: String,
    pub namespace: String,
    pub run_timeout: Duration,
}

impl SyncConfig {
    pub fn new(pipeline_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            namespace: namespace.into(),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        }
    }

    /// Take name and timeout from the report config; the namespace is resolved by the caller
    pub fn from_report_config(config: &ReportConfig, namespace: impl Into<String>) -> Self {
        Self {
            pipeline_name: config.pipeline_name.clone(),
            namespace: namespace.into(),
            run_timeout: config.run_timeout(),
        }
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }
}

/// What happened to the pipeline definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
}

/// Result of a successful sync
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub action: SyncAction,

    /// The pipeline as stored
    pub pipeline: Pipeline,

    /// Name of the triggered run
    pub run_name: String,
}

/// Reconciles the report pipeline against a store and triggers one run
pub struct PipelineSyncer<S> {
    store: S,
    config: SyncConfig,
}

impl<S: PipelineStore> PipelineSyncer<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Persist `spec` and trigger a run of it
    ///
    /// Always triggers, whether or not the spec changed.
    pub async fn sync(&self, spec: PipelineSpec) -> Result<SyncOutcome, SyncError> {
        let (action, pipeline) = self.apply(spec).await?;
        let run_name = self.trigger().await?;

        Ok(SyncOutcome {
            action,
            pipeline,
            run_name,
        })
    }

    /// Create the pipeline, or replace the spec of the existing one
    pub async fn apply(&self, spec: PipelineSpec) -> Result<(SyncAction, Pipeline), SyncError> {
        let name = &self.config.pipeline_name;
        let namespace = &self.config.namespace;

        match self.store.get_pipeline(namespace, name).await {
            Err(e) if e.is_not_found() => {
                info!("Creating pipeline {}", name);
                let pipeline = Pipeline::new(name, namespace, spec);
                let created = self
                    .store
                    .create_pipeline(namespace, &pipeline)
                    .await
                    .map_err(|source| SyncError::Create {
                        name: name.clone(),
                        source,
                    })?;
                Ok((SyncAction::Created, created))
            }
            Err(source) => Err(SyncError::Lookup {
                name: name.clone(),
                source,
            }),
            Ok(mut existing) => {
                // Full replace; the fetched resource version guards the write
                existing.metadata.name = Some(name.clone());
                existing.metadata.namespace = Some(namespace.clone());
                existing.spec = spec;

                info!("Updating existing pipeline {}", name);
                let updated = self
                    .store
                    .update_pipeline(namespace, &existing)
                    .await
                    .map_err(|source| SyncError::Update {
                        name: name.clone(),
                        source,
                    })?;
                Ok((SyncAction::Updated, updated))
            }
        }
    }

    /// Create one run of the pipeline and return its generated name
    pub async fn trigger(&self) -> Result<String, SyncError> {
        let name = &self.config.pipeline_name;
        let run = PipelineRun::for_pipeline(name, &self.config.namespace, self.config.run_timeout);

        let run_err = |source| SyncError::Run {
            name: name.clone(),
            source,
        };

        let created = self
            .store
            .create_pipeline_run(&self.config.namespace, &run)
            .await
            .map_err(run_err)?;

        let run_name = created
            .name()
            .map(str::to_string)
            .ok_or_else(|| run_err(StoreError::Decode("created run has no name".to_string())))?;

        info!("Created pipelinerun {}", run_name);
        Ok(run_name)
    }
}
