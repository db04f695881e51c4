//! CLI command definitions

use crate::core::config::ReportConfig;
use crate::store::{ClusterConfig, StoreError};
use clap::Args;
use std::path::PathBuf;

/// Where the channel documents come from
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Use an existing graph-data checkout instead of cloning
    #[arg(long)]
    pub graph_data_dir: Option<String>,

    /// Repository to clone channel definitions from
    #[arg(long)]
    pub repository_url: Option<String>,

    /// Reuse the checkout at the configured clone path
    #[arg(long)]
    pub skip_clone: bool,
}

impl SourceArgs {
    /// Apply overrides; returns whether a fresh clone is needed
    pub fn apply(&self, config: &mut ReportConfig) -> bool {
        if let Some(url) = &self.repository_url {
            config.repository_url = url.clone();
        }
        match &self.graph_data_dir {
            Some(dir) => {
                config.clone_path = PathBuf::from(dir);
                false
            }
            None => !self.skip_clone,
        }
    }
}

/// Knobs of the synthesis itself
#[derive(Debug, Args, Clone, Default)]
pub struct SynthesisArgs {
    /// Lowest minor release to report on
    #[arg(long)]
    pub min_minor: Option<u64>,

    /// Maximum versions per report task
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Fail on malformed versions instead of skipping them
    #[arg(long)]
    pub strict_versions: bool,
}

impl SynthesisArgs {
    pub fn apply(&self, config: &mut ReportConfig) {
        if let Some(min_minor) = self.min_minor {
            config.min_minor = min_minor;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.strict_versions {
            config.strict_versions = true;
        }
    }
}

/// API server connection
#[derive(Debug, Args, Clone, Default)]
pub struct ClusterArgs {
    /// Kubernetes API server URL (kubeconfig or in-cluster service when omitted)
    #[arg(long, env = "KUBERNETES_API_SERVER")]
    pub api_server: Option<String>,

    /// Kubeconfig path list; `~/.kube/config` when unset
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Bearer token for the API server
    #[arg(long, env = "KUBERNETES_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// PEM CA bundle for the API server
    #[arg(long)]
    pub ca_cert: Option<String>,

    /// Skip TLS verification
    #[arg(long)]
    pub insecure: bool,
}

impl ClusterArgs {
    /// Explicit flags over the kubeconfig context, then the in-cluster service account
    pub fn to_cluster_config(&self) -> Result<ClusterConfig, StoreError> {
        let mut config = match &self.api_server {
            Some(url) => ClusterConfig::new(url.clone()),
            None => ClusterConfig::discover(self.kubeconfig.as_deref())?,
        };
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(ca) = &self.ca_cert {
            config.ca_data = None;
            config = config.with_ca_cert(ca);
        }
        if self.insecure {
            config.insecure = true;
        }
        Ok(config)
    }
}

/// Synthesise, reconcile and trigger
#[derive(Debug, Args, Clone)]
pub struct SyncCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub synthesis: SynthesisArgs,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Namespace of the pipeline (service account namespace when omitted)
    #[arg(short, long, env = "PIPELINE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Name of the pipeline object
    #[arg(long)]
    pub pipeline_name: Option<String>,
}

/// Synthesise and print
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub synthesis: SynthesisArgs,

    /// Namespace written into the printed resource
    #[arg(short, long, env = "PIPELINE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Print admitted versions
#[derive(Debug, Args, Clone)]
pub struct VersionsCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub synthesis: SynthesisArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_data_dir_skips_clone() {
        let mut config = ReportConfig::default();
        let args = SourceArgs {
            graph_data_dir: Some("/data/graph".to_string()),
            ..SourceArgs::default()
        };
        assert!(!args.apply(&mut config));
        assert_eq!(config.channels_path(), PathBuf::from("/data/graph/channels"));
    }

    #[test]
    fn test_clone_by_default() {
        let mut config = ReportConfig::default();
        assert!(SourceArgs::default().apply(&mut config));
    }

    #[test]
    fn test_synthesis_overrides() {
        let mut config = ReportConfig::default();
        SynthesisArgs {
            min_minor: Some(9),
            batch_size: None,
            strict_versions: true,
        }
        .apply(&mut config);
        assert_eq!(config.min_minor, 9);
        assert_eq!(config.batch_size, 10);
        assert!(config.strict_versions);
    }

    #[test]
    fn test_explicit_cluster_args() {
        let args = ClusterArgs {
            api_server: Some("https://10.0.0.1:6443".to_string()),
            token: Some("abc".to_string()),
            insecure: true,
            ..ClusterArgs::default()
        };
        let config = args.to_cluster_config().unwrap();
        assert_eq!(config.api_server, "https://10.0.0.1:6443");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert!(config.insecure);
    }

    #[test]
    fn test_kubeconfig_context_with_token_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(
            &path,
            r#"
current-context: ws
clusters:
  - name: dev
    cluster: { server: "https://dev.example:6443" }
contexts:
  - name: ws
    context: { cluster: dev, user: me, namespace: reports }
users:
  - name: me
    user: { token: from-kubeconfig }
"#,
        )
        .unwrap();

        let args = ClusterArgs {
            kubeconfig: path.to_str().map(String::from),
            token: Some("from-flag".to_string()),
            ..ClusterArgs::default()
        };
        let config = args.to_cluster_config().unwrap();
        assert_eq!(config.api_server, "https://dev.example:6443");
        assert_eq!(config.token.as_deref(), Some("from-flag"));
        assert_eq!(config.namespace.as_deref(), Some("reports"));
    }
}
