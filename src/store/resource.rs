//! Tekton resources as exchanged with the Kubernetes API

use crate::core::PipelineSpec;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// API group and version of the Tekton resources
pub const API_VERSION: &str = "tekton.dev/v1beta1";

/// Object metadata
///
/// Fields not modelled here (uid, labels, managedFields, ...) are kept in
/// `extra` so an object read from the server can be written back intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Optimistic concurrency token, echoed back on update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A reusable pipeline definition
///
/// The spec of a pipeline read from the server may use task shapes this
/// crate never writes (`taskSpec`, resolver refs, custom kinds). Such a spec
/// decodes as empty; only the metadata of a fetched pipeline is relied on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "lenient_spec")]
    pub spec: PipelineSpec,
}

fn lenient_spec<'de, D>(deserializer: D) -> Result<PipelineSpec, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
        debug!("Ignoring pipeline spec outside the report model: {}", e);
        PipelineSpec::default()
    }))
}

impl Pipeline {
    pub fn new(name: &str, namespace: &str, spec: PipelineSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "Pipeline".to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }
}

/// Reference from a run to the pipeline it executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    pub pipeline_ref: PipelineRef,

    /// Go duration string, e.g. "1h0m0s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// One triggered execution of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PipelineRunSpec,
}

impl PipelineRun {
    /// A run of `pipeline_name` whose name the server generates from the pipeline name
    pub fn for_pipeline(pipeline_name: &str, namespace: &str, timeout: Duration) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "PipelineRun".to_string(),
            metadata: ObjectMeta {
                generate_name: Some(format!("{}-", pipeline_name)),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec: PipelineRunSpec {
                pipeline_ref: PipelineRef {
                    name: pipeline_name.to_string(),
                },
                timeout: Some(format_go_duration(timeout)),
            },
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }
}

/// Format a duration the way Go's `time.Duration.String` does, at second precision
pub fn format_go_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Error body returned by the Kubernetes API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub reason: String,
}
