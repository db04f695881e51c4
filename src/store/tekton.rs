//! Tekton client over the Kubernetes REST API

use crate::store::{
    kubeconfig::kubeconfig_path,
    resource::{Pipeline, PipelineRun, Status, API_VERSION},
    PipelineStore, StoreError,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mount point of the pod's service account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Namespace used when neither configuration nor the service account names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// How to reach and authenticate against the API server
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    /// Base URL, e.g. `https://10.0.0.1:443`
    pub api_server: String,

    /// Bearer token
    pub token: Option<String>,

    /// PEM bundle to trust in addition to the system roots
    pub ca_cert: Option<PathBuf>,

    /// Inline PEM bundle, used instead of `ca_cert` when set
    pub ca_data: Option<Vec<u8>>,

    /// PEM client certificate followed by its private key
    pub identity_pem: Option<Vec<u8>>,

    /// Skip TLS verification
    pub insecure: bool,

    /// Namespace the credentials default to
    pub namespace: Option<String>,
}

impl ClusterConfig {
    pub fn new(api_server: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_ca_cert(mut self, ca_cert: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(ca_cert.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Configuration of a pod talking to its own cluster
    ///
    /// Reads `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` and the
    /// service account token and CA bundle, when present.
    pub fn in_cluster() -> Result<Self, StoreError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            StoreError::Config(
                "no API server given and KUBERNETES_SERVICE_HOST is not set".to_string(),
            )
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        // IPv6 service hosts need brackets inside a URL
        let host = if host.contains(':') { format!("[{}]", host) } else { host };
        let mut config = Self::new(format!("https://{}:{}", host, port));

        let sa_dir = Path::new(SERVICE_ACCOUNT_DIR);
        if let Some(token) = read_trimmed(&sa_dir.join("token")) {
            config.token = Some(token);
        }
        let ca = sa_dir.join("ca.crt");
        if ca.exists() {
            config.ca_cert = Some(ca);
        }
        config.namespace = read_trimmed(&sa_dir.join("namespace"));

        Ok(config)
    }
}

/// Namespace implied by the ambient credentials
///
/// The current kubeconfig context's namespace, else the namespace of the
/// service account this process runs as, else `default`.
pub fn default_namespace() -> String {
    let kubeconfig = std::env::var("KUBECONFIG").ok();
    kubeconfig_path(kubeconfig.as_deref())
        .and_then(|path| ClusterConfig::from_kubeconfig(&path).ok())
        .and_then(|config| config.namespace)
        .or_else(|| read_trimmed(&Path::new(SERVICE_ACCOUNT_DIR).join("namespace")))
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pipeline store backed by the Tekton API of a Kubernetes cluster
#[derive(Debug, Clone)]
pub struct TektonClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl TektonClient {
    pub fn new(config: &ClusterConfig) -> Result<Self, StoreError> {
        if config.api_server.trim().is_empty() {
            return Err(StoreError::Config("API server URL is empty".to_string()));
        }

        let mut builder = Client::builder().danger_accept_invalid_certs(config.insecure);

        let ca_pem = match (&config.ca_data, &config.ca_cert) {
            (Some(data), _) => Some(data.clone()),
            (None, Some(path)) => Some(std::fs::read(path).map_err(|e| {
                StoreError::Config(format!("cannot read CA bundle {}: {}", path.display(), e))
            })?),
            (None, None) => None,
        };
        if let Some(pem) = ca_pem {
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| StoreError::Config(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(pem) = &config.identity_pem {
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|e| StoreError::Config(format!("invalid client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.api_server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn collection_url(&self, namespace: &str, resource: &str) -> String {
        format!(
            "{}/apis/{}/namespaces/{}/{}",
            self.base_url, API_VERSION, namespace, resource
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Map a response onto the store's error model and decode a success body
async fn decode<T: DeserializeOwned>(
    response: Response,
    kind: &'static str,
    name: &str,
) -> Result<T, StoreError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(format!("{} {}: {}", kind, name, e)));
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!("Could not read error body for {} {}: {}", kind, name, e);
            format!("unreadable response body: {}", e)
        }
    };
    let message = match serde_json::from_str::<Status>(&body) {
        Ok(s) if !s.message.is_empty() => s.message,
        _ => body.trim().to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound {
            kind,
            name: name.to_string(),
        }),
        StatusCode::CONFLICT => Err(StoreError::Conflict(message)),
        _ => Err(StoreError::Api {
            status: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl PipelineStore for TektonClient {
    async fn get_pipeline(&self, namespace: &str, name: &str) -> Result<Pipeline, StoreError> {
        let url = format!("{}/{}", self.collection_url(namespace, "pipelines"), name);
        debug!("GET {}", url);

        let response = self.authorize(self.http.get(&url)).send().await?;
        decode(response, "Pipeline", name).await
    }

    async fn create_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        let url = self.collection_url(namespace, "pipelines");
        debug!("POST {}", url);

        let response = self
            .authorize(self.http.post(&url).json(pipeline))
            .send()
            .await?;
        decode(response, "Pipeline", pipeline.name().unwrap_or_default()).await
    }

    async fn update_pipeline(
        &self,
        namespace: &str,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, StoreError> {
        let name = pipeline
            .name()
            .ok_or_else(|| StoreError::Config("pipeline has no name".to_string()))?;
        let url = format!("{}/{}", self.collection_url(namespace, "pipelines"), name);
        debug!("PUT {}", url);

        let response = self
            .authorize(self.http.put(&url).json(pipeline))
            .send()
            .await?;
        decode(response, "Pipeline", name).await
    }

    async fn create_pipeline_run(
        &self,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, StoreError> {
        let url = self.collection_url(namespace, "pipelineruns");
        debug!("POST {}", url);

        let response = self.authorize(self.http.post(&url).json(run)).send().await?;
        let label = run
            .metadata
            .name
            .as_deref()
            .or(run.metadata.generate_name.as_deref())
            .unwrap_or_default();
        decode(response, "PipelineRun", label).await
    }
}
