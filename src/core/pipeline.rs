//! Pipeline domain model and assembly

use crate::core::{
    batch::{batch_versions, VersionBatch, DEFAULT_BATCH_SIZE},
    config::ReportConfig,
    edges::{plan_edges, EdgePair},
    error::SynthesisError,
    lines::{group_minor_lines, DEFAULT_LINE_WINDOW},
    task::{Task, TaskRef},
    version::ReleaseVersion,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Parameter carrying a batch of versions
pub const VERSIONS_PARAM: &str = "versions";

/// Parameter carrying the source version of an upgrade edge
pub const FROM_PARAM: &str = "from";

/// Parameter carrying the target versions of an upgrade edge
pub const TO_PARAM: &str = "to";

/// Longest name the orchestrator accepts for a task
const MAX_TASK_NAME_LEN: usize = 63;

/// Hex digits of the digest that disambiguates a shortened or clashing name
const NAME_DIGEST_LEN: usize = 8;

/// An ordered set of tasks plus the tasks that always run after them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finally: Vec<Task>,
}

impl PipelineSpec {
    /// Names of all tasks, main list first
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .iter()
            .chain(self.finally.iter())
            .map(|t| t.name.as_str())
    }

    /// Get a task by name from either list
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .chain(self.finally.iter())
            .find(|t| t.name == name)
    }

    /// Check that task names are unique and acceptable to the orchestrator
    pub fn validate(&self) -> Result<(), SynthesisError> {
        let mut seen = HashSet::new();
        for name in self.task_names() {
            if !is_valid_task_name(name) {
                return Err(SynthesisError::InvalidTaskName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(SynthesisError::DuplicateTask(name.to_string()));
            }
        }
        Ok(())
    }
}

/// RFC 1123 label: lowercase alphanumerics and '-', alphanumeric at both ends
fn is_valid_task_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    !bytes.is_empty()
        && bytes.len() <= MAX_TASK_NAME_LEN
        && bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
        && bytes.iter().all(|b| edge_ok(b) || *b == b'-')
}

/// Builds the report pipeline from a version list
#[derive(Debug, Clone)]
pub struct PipelineAssembler {
    report_task: TaskRef,
    edge_task: TaskRef,
    stats_task: TaskRef,
    stats_task_name: String,
    batch_size: usize,
    line_window: usize,
}

impl Default for PipelineAssembler {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl PipelineAssembler {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            report_task: TaskRef::namespaced(&config.report_task),
            edge_task: TaskRef::namespaced(&config.edge_task),
            stats_task: TaskRef::namespaced(&config.stats_task),
            stats_task_name: config.stats_task_name.clone(),
            batch_size: if config.batch_size == 0 { DEFAULT_BATCH_SIZE } else { config.batch_size },
            line_window: if config.max_versions_per_line == 0 {
                DEFAULT_LINE_WINDOW
            } else {
                config.max_versions_per_line
            },
        }
    }

    /// Build the pipeline for an ordered, deduplicated version list
    pub fn assemble(&self, versions: &[ReleaseVersion]) -> Result<PipelineSpec, SynthesisError> {
        let batches = batch_versions(versions, self.batch_size);
        let lines = group_minor_lines(versions, self.line_window);
        let edges = plan_edges(&lines);
        self.compose(&batches, &edges)
    }

    /// Batch tasks, then edge tasks, then the stats task in `finally`
    pub fn compose(
        &self,
        batches: &[VersionBatch],
        edges: &[EdgePair],
    ) -> Result<PipelineSpec, SynthesisError> {
        let mut tasks = Vec::with_capacity(batches.len() + edges.len());
        tasks.extend(batches.iter().map(|batch| self.batch_task(batch)));

        let mut taken: HashSet<String> = tasks.iter().map(|t| t.name.clone()).collect();
        taken.insert(self.stats_task_name.clone());
        for edge in edges {
            let name = edge_task_name(&edge.from, &taken);
            taken.insert(name.clone());
            tasks.push(self.edge_task(edge, name));
        }

        let finally = vec![Task::new(&self.stats_task_name, self.stats_task.clone())];

        let spec = PipelineSpec { tasks, finally };
        spec.validate()?;
        Ok(spec)
    }

    fn batch_task(&self, batch: &VersionBatch) -> Task {
        Task::new(format!("batch-{}", batch.start), self.report_task.clone())
            .with_param(VERSIONS_PARAM, batch.joined())
    }

    fn edge_task(&self, edge: &EdgePair, name: String) -> Task {
        Task::new(name, self.edge_task.clone())
            .with_param(FROM_PARAM, edge.from.as_str())
            .with_param(TO_PARAM, edge.to.as_str())
    }
}

/// `upgrade-edge-from-<version, dots as dashes>`
///
/// When that name is already taken or too long, it is cut down and suffixed
/// with a digest of the raw version, so the result is stable across runs.
fn edge_task_name(from: &ReleaseVersion, taken: &HashSet<String>) -> String {
    let base = format!("upgrade-edge-from-{}", from.undotted().to_lowercase());
    if base.len() <= MAX_TASK_NAME_LEN && !taken.contains(&base) {
        return base;
    }

    let keep = MAX_TASK_NAME_LEN - NAME_DIGEST_LEN - 1;
    let stem = base[..base.len().min(keep)].trim_end_matches('-');

    let mut salt = 0u32;
    loop {
        let seed = if salt == 0 {
            from.as_str().to_string()
        } else {
            format!("{}#{}", from.as_str(), salt)
        };
        let digest = format!("{:x}", Sha256::digest(seed.as_bytes()));
        let name = format!("{}-{}", stem, &digest[..NAME_DIGEST_LEN]);
        if !taken.contains(&name) {
            return name;
        }
        salt += 1;
    }
}
