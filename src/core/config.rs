//! Report configuration from YAML

use crate::core::{
    batch::DEFAULT_BATCH_SIZE,
    lines::DEFAULT_LINE_WINDOW,
    version::{VersionFilter, DEFAULT_MIN_MINOR},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upper bound on one pipeline run
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 3600;

/// Everything a synthesis run needs to know besides the versions themselves
///
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Git repository holding the channel definitions
    pub repository_url: String,

    /// Where the repository is cloned to
    pub clone_path: PathBuf,

    /// Directory of channel documents, relative to the clone
    pub channels_dir: String,

    /// Lowest minor release that gets reports
    pub min_minor: u64,

    /// Fail the run on a malformed version instead of skipping it
    pub strict_versions: bool,

    /// Maximum versions per report task
    pub batch_size: usize,

    /// Newest patches kept per minor line for upgrade edges
    pub max_versions_per_line: usize,

    /// Name of the pipeline object in the store
    pub pipeline_name: String,

    /// Namespace for the pipeline and its runs (client default when unset)
    pub namespace: Option<String>,

    /// Task run by every version batch
    pub report_task: String,

    /// Task run for every upgrade edge
    pub edge_task: String,

    /// Task run after everything else
    pub stats_task: String,

    /// Name of the stats task inside the pipeline
    pub stats_task_name: String,

    /// Execution timeout of a triggered run
    pub run_timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            repository_url: "https://github.com/openshift/cincinnati-graph-data".to_string(),
            clone_path: PathBuf::from("/tmp/graph-data"),
            channels_dir: "channels".to_string(),
            min_minor: DEFAULT_MIN_MINOR,
            strict_versions: false,
            batch_size: DEFAULT_BATCH_SIZE,
            max_versions_per_line: DEFAULT_LINE_WINDOW,
            pipeline_name: "build-reports".to_string(),
            namespace: None,
            report_task: "create-report".to_string(),
            edge_task: "edge-upgrade-report".to_string(),
            stats_task: "stats-report".to_string(),
            stats_task_name: "stats".to_string(),
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
        }
    }
}

impl ReportConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ReportConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.max_versions_per_line == 0 {
            anyhow::bail!("max_versions_per_line must be at least 1");
        }
        if self.run_timeout_secs == 0 {
            anyhow::bail!("run_timeout_secs must be at least 1");
        }

        for (field, value) in [
            ("pipeline_name", &self.pipeline_name),
            ("report_task", &self.report_task),
            ("edge_task", &self.edge_task),
            ("stats_task", &self.stats_task),
            ("stats_task_name", &self.stats_task_name),
            ("channels_dir", &self.channels_dir),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", field);
            }
        }

        if let Some(namespace) = &self.namespace {
            if namespace.trim().is_empty() {
                anyhow::bail!("namespace must not be empty when set");
            }
        }

        Ok(())
    }

    /// The version filter this configuration describes
    pub fn version_filter(&self) -> VersionFilter {
        VersionFilter::new(self.min_minor).strict(self.strict_versions)
    }

    /// Path of the channel directory inside the clone
    pub fn channels_path(&self) -> PathBuf {
        self.clone_path.join(&self.channels_dir)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}
