//! Cluster access from a kubeconfig file
//!
//! Only the current context is used: its cluster's server and CA, its user's
//! bearer token or client certificate, and its namespace. Exec and
//! auth-provider plugins are not supported.

use crate::store::{tekton::ClusterConfig, StoreError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct Kubeconfig {
    current_context: Option<String>,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    #[serde(default)]
    cluster: ClusterEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct ClusterEntry {
    server: String,
    certificate_authority: Option<PathBuf>,
    certificate_authority_data: Option<String>,
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    #[serde(default)]
    context: ContextEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContextEntry {
    cluster: String,
    user: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct UserEntry {
    token: Option<String>,
    token_file: Option<PathBuf>,
    client_certificate: Option<PathBuf>,
    client_certificate_data: Option<String>,
    client_key: Option<PathBuf>,
    client_key_data: Option<String>,
}

/// Locate the kubeconfig to use
///
/// `list` is a `KUBECONFIG`-style path list; its first existing file wins.
/// Without a list, `~/.kube/config` is used when it exists.
pub fn kubeconfig_path(list: Option<&str>) -> Option<PathBuf> {
    match list.filter(|l| !l.trim().is_empty()) {
        Some(list) => std::env::split_paths(list).find(|p| p.is_file()),
        None => dirs::home_dir()
            .map(|home| home.join(".kube").join("config"))
            .filter(|p| p.is_file()),
    }
}

impl ClusterConfig {
    /// Settings of the current context of a kubeconfig file
    pub fn from_kubeconfig(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read kubeconfig {}: {}", path.display(), e))
        })?;
        let kubeconfig: Kubeconfig = serde_yaml::from_str(&text).map_err(|e| {
            StoreError::Config(format!("invalid kubeconfig {}: {}", path.display(), e))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        kubeconfig.resolve(base_dir)
    }

    /// Kubeconfig when one is found, otherwise the in-cluster service account
    pub fn discover(kubeconfig: Option<&str>) -> Result<Self, StoreError> {
        match kubeconfig_path(kubeconfig) {
            Some(path) => {
                debug!("Using kubeconfig {}", path.display());
                Self::from_kubeconfig(&path)
            }
            None => Self::in_cluster(),
        }
    }
}

impl Kubeconfig {
    fn resolve(&self, base_dir: &Path) -> Result<ClusterConfig, StoreError> {
        let context_name = self
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| StoreError::Config("kubeconfig has no current-context".to_string()))?;

        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| {
                StoreError::Config(format!("context {} not found in kubeconfig", context_name))
            })?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| {
                StoreError::Config(format!("cluster {} not found in kubeconfig", context.cluster))
            })?;

        if cluster.server.trim().is_empty() {
            return Err(StoreError::Config(format!(
                "cluster {} has no server",
                context.cluster
            )));
        }

        let mut config =
            ClusterConfig::new(cluster.server.clone()).with_insecure(cluster.insecure_skip_tls_verify);

        if let Some(data) = &cluster.certificate_authority_data {
            config.ca_data = Some(decode_data("certificate-authority-data", data)?);
        } else if let Some(path) = &cluster.certificate_authority {
            config.ca_cert = Some(base_dir.join(path));
        }

        // A context naming no known user means anonymous access
        let user = context
            .user
            .as_deref()
            .and_then(|name| self.users.iter().find(|u| u.name == name))
            .map(|u| &u.user);
        if let Some(user) = user {
            config.token = match (&user.token, &user.token_file) {
                (Some(token), _) => Some(token.clone()),
                (None, Some(file)) => Some(read_text(&base_dir.join(file))?.trim().to_string()),
                (None, None) => None,
            };

            let cert = load(
                base_dir,
                "client-certificate",
                &user.client_certificate_data,
                &user.client_certificate,
            )?;
            let key = load(base_dir, "client-key", &user.client_key_data, &user.client_key)?;
            if let (Some(mut cert), Some(key)) = (cert, key) {
                cert.push(b'\n');
                cert.extend_from_slice(&key);
                config.identity_pem = Some(cert);
            }
        }

        config.namespace = context.namespace.clone().filter(|n| !n.is_empty());
        Ok(config)
    }
}

/// Inline `*-data` wins over the file path
fn load(
    base_dir: &Path,
    field: &str,
    data: &Option<String>,
    path: &Option<PathBuf>,
) -> Result<Option<Vec<u8>>, StoreError> {
    match (data, path) {
        (Some(data), _) => decode_data(field, data).map(Some),
        (None, Some(path)) => {
            let path = base_dir.join(path);
            std::fs::read(&path).map(Some).map_err(|e| {
                StoreError::Config(format!("cannot read {} {}: {}", field, path.display(), e))
            })
        }
        (None, None) => Ok(None),
    }
}

fn decode_data(field: &str, data: &str) -> Result<Vec<u8>, StoreError> {
    BASE64
        .decode(data.trim())
        .map_err(|e| StoreError::Config(format!("invalid {}: {}", field, e)))
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    std::fs::read_to_string(path)
        .map_err(|e| StoreError::Config(format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: reports
clusters:
  - name: prod
    cluster:
      server: https://api.prod.example:6443
      certificate-authority-data: LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0t
  - name: lab
    cluster:
      server: https://api.lab.example:6443
      insecure-skip-tls-verify: true
contexts:
  - name: reports
    context:
      cluster: prod
      user: bot
      namespace: upgrade-reports
  - name: lab
    context:
      cluster: lab
users:
  - name: bot
    user:
      token: s3cret
preferences: {}
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_current_context_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config", KUBECONFIG);

        let config = ClusterConfig::from_kubeconfig(&path).unwrap();
        assert_eq!(config.api_server, "https://api.prod.example:6443");
        assert_eq!(config.token.as_deref(), Some("s3cret"));
        assert_eq!(config.namespace.as_deref(), Some("upgrade-reports"));
        assert_eq!(config.ca_data.as_deref(), Some(b"-----BEGIN CERTIFICATE-----".as_slice()));
        assert!(!config.insecure);
        assert!(config.identity_pem.is_none());
    }

    #[test]
    fn test_context_without_user_or_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let text = KUBECONFIG.replace("current-context: reports", "current-context: lab");
        let path = write(dir.path(), "config", &text);

        let config = ClusterConfig::from_kubeconfig(&path).unwrap();
        assert_eq!(config.api_server, "https://api.lab.example:6443");
        assert!(config.insecure);
        assert!(config.token.is_none());
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_relative_files_resolve_against_kubeconfig_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "token", "from-file\n");
        write(dir.path(), "client.crt", "CERT");
        write(dir.path(), "client.key", "KEY");
        let path = write(
            dir.path(),
            "config",
            r#"
current-context: c
clusters:
  - name: k
    cluster:
      server: https://127.0.0.1:6443
      certificate-authority: ca.crt
contexts:
  - name: c
    context: { cluster: k, user: u }
users:
  - name: u
    user:
      token-file: token
      client-certificate: client.crt
      client-key: client.key
"#,
        );

        let config = ClusterConfig::from_kubeconfig(&path).unwrap();
        assert_eq!(config.token.as_deref(), Some("from-file"));
        assert_eq!(config.ca_cert, Some(dir.path().join("ca.crt")));
        assert_eq!(config.identity_pem.as_deref(), Some(b"CERT\nKEY".as_slice()));
    }

    #[test]
    fn test_missing_current_context_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let text = KUBECONFIG.replace("current-context: reports", "current-context: gone");
        let path = write(dir.path(), "config", &text);

        let err = ClusterConfig::from_kubeconfig(&path).unwrap_err();
        assert!(matches!(err, StoreError::Config(ref m) if m.contains("gone")));
    }

    #[test]
    fn test_path_list_takes_first_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "second", KUBECONFIG);
        let missing = dir.path().join("first");

        let list = std::env::join_paths([missing, path.clone()]).unwrap();
        assert_eq!(kubeconfig_path(list.to_str()), Some(path));

        let only_missing = dir.path().join("nope");
        assert_eq!(kubeconfig_path(only_missing.to_str()), None);
    }

    #[test]
    fn test_discover_prefers_kubeconfig() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config", KUBECONFIG);

        let config = ClusterConfig::discover(path.to_str()).unwrap();
        assert_eq!(config.api_server, "https://api.prod.example:6443");
    }
}
